use crate::symbols::SymbolTable;

const ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Words the output language would reject as a variable name.
const RESERVED: &[&str] = &[
    "do", "if", "in", "for", "let", "new", "try", "var", "case", "else", "enum", "eval", "null",
    "this", "true", "void", "with", "break", "catch", "class", "const", "false", "super", "throw",
    "while", "yield", "delete", "export", "import", "public", "return", "static", "switch",
    "typeof", "default", "extends", "finally", "package", "private", "continue", "debugger",
    "function", "arguments", "interface", "protected", "implements", "instanceof", "undefined",
];

/// Name at position `index` of the sequence a, b, ..., z, aa, ab, ...
pub fn identifier_for(index: usize) -> String {
    let mut letters = Vec::new();
    let mut index = index;
    loop {
        if let Some(letter) = ALPHABET.get(index % ALPHABET.len()) {
            letters.push(char::from(*letter));
        }
        if index < ALPHABET.len() {
            break;
        }
        index = index / ALPHABET.len() - 1;
    }
    letters.iter().rev().collect()
}

/// Hands out short, collision-free variable names during generation.
///
/// Each view declaration opens its own scope with [`save`](Self::save) and
/// closes it with [`restore`](Self::restore), so numbering restarts inside the
/// declaration and resumes afterwards.
#[derive(Debug, Clone, Default)]
pub struct IdentifierAllocator {
    next: usize,
    stack: Vec<usize>,
}

impl IdentifierAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next name not present in `symbols` and not a reserved word.
    pub fn create(&mut self, symbols: &SymbolTable) -> String {
        loop {
            let candidate = identifier_for(self.next);
            self.next += 1;
            if !symbols.contains(&candidate) && !RESERVED.contains(&candidate.as_str()) {
                return candidate;
            }
        }
    }

    pub fn save(&mut self) {
        self.stack.push(self.next);
        self.next = 0;
    }

    /// Closes the innermost scope. Returns `false`, leaving the counter
    /// untouched, when no scope is open.
    #[must_use]
    pub fn restore(&mut self) -> bool {
        match self.stack.pop() {
            Some(previous) => {
                self.next = previous;
                true
            }
            None => false,
        }
    }

    /// Number of scopes currently open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}
