use hector::{Compiler, GrammarProfile, Options};
use rand::Rng;

const WHITESPACE: [char; 3] = [' ', '\t', '\n'];

pub fn get_compiler() -> Compiler {
    Compiler::new(Options::default()).unwrap()
}

pub fn get_markup_compiler() -> Compiler {
    Compiler::new(Options::default().with_profile(GrammarProfile::Markup)).unwrap()
}

fn random_whitespace(min: usize) -> String {
    let mut rng = rand::rng();
    let length = rng.random_range(min..10);
    (0..length)
        .map(|_| WHITESPACE[rng.random_range(0..WHITESPACE.len())])
        .collect()
}

pub fn generate_random_whitespace() -> String {
    random_whitespace(0)
}

pub fn generate_random_whitespace_at_least_one() -> String {
    random_whitespace(1)
}
