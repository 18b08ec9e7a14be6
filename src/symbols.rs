use indexmap::IndexSet;

/// Every identifier seen while parsing, in first-seen order.
///
/// Filled by the parser and consulted by the identifier allocator so generated
/// names never shadow names written in the template.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolTable {
    symbols: IndexSet<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `symbol`, returning false if it was already known.
    pub fn insert<T: AsRef<str>>(&mut self, symbol: T) -> bool {
        let symbol = symbol.as_ref();
        if self.symbols.contains(symbol) {
            return false;
        }
        self.symbols.insert(symbol.to_string())
    }

    pub fn contains<T: AsRef<str>>(&self, symbol: T) -> bool {
        self.symbols.contains(symbol.as_ref())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut table = Self::new();
        for symbol in iter {
            table.insert(symbol);
        }
        table
    }
}
