use rand::{Rng, SeedableRng, rngs::StdRng};

const CONSTRUCTORS: [&str; 6] = ["Panel", "Label", "Button", "List", "UI.Icon", "Header"];

/// Generate n random templates to use in the benchmark
pub fn generate_random_templates(n: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(42); // Fixed seed for reproducibility
    (0..n)
        .map(|i| {
            let mut source = String::new();
            source.push_str(&format!("def Card{} title = \"card\" {{\n", i));
            random_body(&mut rng, &mut source, 2);
            source.push_str("};\n");
            for _ in 0..rng.random_range(2..6) {
                random_instance(&mut rng, &mut source, 3);
            }
            source
        })
        .collect()
}

fn random_instance(rng: &mut StdRng, source: &mut String, depth: usize) {
    let constructor = CONSTRUCTORS[rng.random_range(0..CONSTRUCTORS.len())];
    source.push_str(constructor);
    for _ in 0..rng.random_range(0..3) {
        let key = random_string(rng, 3, 8);
        if rng.random_bool(0.5) {
            source.push_str(&format!(" {} = \"{}\"", key, random_string(rng, 1, 12)));
        } else {
            source.push_str(&format!(" {} = ${}?", key, random_string(rng, 3, 6)));
        }
    }

    if depth == 0 || rng.random_bool(0.3) {
        source.push_str(";\n");
        return;
    }

    source.push_str(" {\n");
    if rng.random_bool(0.2) {
        for _ in 0..rng.random_range(1..4) {
            source.push_str(&format!(
                "{}: ${};\n",
                random_string(rng, 3, 8),
                random_string(rng, 3, 6)
            ));
        }
    } else {
        random_body(rng, source, depth - 1);
    }
    source.push_str("}\n");
}

fn random_body(rng: &mut StdRng, source: &mut String, depth: usize) {
    for _ in 0..rng.random_range(1..5) {
        match rng.random_range(0..3) {
            0 => source.push_str(&format!("\"{}\"\n", random_string(rng, 2, 20))),
            1 => source.push_str(&format!("${};\n", random_string(rng, 3, 6))),
            _ => random_instance(rng, source, depth),
        }
    }
}

/// Generate a random string with length between min and max
fn random_string(rng: &mut StdRng, min_len: usize, max_len: usize) -> String {
    let charset = "abcdefghijklmnopqrstuvwxyz";
    let len = rng.random_range(min_len..=max_len);

    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..charset.len());
            charset.chars().nth(idx).unwrap()
        })
        .collect()
}

// Print binary size information - can be used from individual benchmarks
pub fn print_binary_size() {
    let binary_path = std::env::current_exe().unwrap();
    let metadata = std::fs::metadata(binary_path.clone()).unwrap();
    let size_bytes = metadata.len();
    let size_kb = size_bytes as f64 / 1024.0;
    let size_mb = size_kb / 1024.0;

    println!(
        "Binary size: {:.2} MB ({:.2} KB, {} bytes)",
        size_mb, size_kb, size_bytes
    );
    println!("Binary path: {}", binary_path.display());
}
