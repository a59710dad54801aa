use std::path::Path;

fn main() {
    let catalog_path = Path::new("catalogs/index_tables.json");
    validate_catalog_file(catalog_path);
    set_build_dependencies();
}

fn validate_catalog_file(catalog_path: &Path) {
    // Ensure catalog exists at build time
    assert!(
        catalog_path.exists(),
        "\n\nCATALOG BUILD ERROR: File not found\n\
         Path: {}\n\
         Please create the index table catalog before building.\n",
        catalog_path.display()
    );

    let catalog_contents = std::fs::read_to_string(catalog_path).unwrap_or_else(|e| {
        panic!(
            "\n\nCATALOG BUILD ERROR: Failed to read file\n\
             Path: {}\n\
             Error: {e}\n",
            catalog_path.display()
        );
    });

    let catalog: serde_json::Value = serde_json::from_str(&catalog_contents).unwrap_or_else(|e| {
        panic!(
            "\n\nCATALOG BUILD ERROR: Invalid JSON\n\
             Path: {}\n\
             Error: {e}\n\
             Hint: Check for missing commas, brackets, or invalid syntax.\n",
            catalog_path.display()
        );
    });

    validate_catalog_structure(&catalog);
}

fn validate_catalog_structure(catalog: &serde_json::Value) {
    assert!(
        catalog.is_object(),
        "\n\nCATALOG BUILD ERROR: Root must be a JSON object\n\
         Got: {catalog}\n"
    );

    let phix_sets = catalog
        .get("phix_sets")
        .and_then(|v| v.as_array())
        .unwrap_or_else(|| {
            panic!(
                "\n\nCATALOG BUILD ERROR: Missing 'phix_sets' array\n\
                 The catalog must have a top-level 'phix_sets' array.\n"
            );
        });

    for (i, set) in phix_sets.iter().enumerate() {
        validate_phix_set(set, i);
    }

    let tenx = validate_code_table(catalog, "chromium_10x");
    let smartseq = validate_code_table(catalog, "smartseq3");

    println!(
        "cargo:warning=Validated index catalog: {} PhiX sets, {tenx} 10X codes, {smartseq} SMART-seq3 codes",
        phix_sets.len()
    );
}

fn validate_phix_set(set: &serde_json::Value, index: usize) {
    let name = set
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("<unknown>");

    assert!(
        set.get("name").is_some(),
        "\n\nCATALOG BUILD ERROR: PhiX set at index {index} missing 'name' field\n"
    );
    assert!(
        set.get("nickname").is_some(),
        "\n\nCATALOG BUILD ERROR: PhiX set '{name}' missing 'nickname' field\n"
    );

    let indices = set
        .get("indices")
        .and_then(|v| v.as_array())
        .unwrap_or_else(|| {
            panic!("\n\nCATALOG BUILD ERROR: PhiX set '{name}' missing 'indices' array\n");
        });

    assert!(
        indices.len() == 4,
        "\n\nCATALOG BUILD ERROR: PhiX set '{name}' must have exactly 4 index pairs, found {}\n",
        indices.len()
    );

    for pair in indices {
        let seqs = pair.as_array().map(Vec::as_slice).unwrap_or_default();
        assert!(
            seqs.len() == 2 && seqs.iter().all(is_dna),
            "\n\nCATALOG BUILD ERROR: PhiX set '{name}' has a malformed index pair: {pair}\n\
             Each pair must be two ACGT strings.\n"
        );
    }
}

/// Count entries of an optional code -> sequences table, checking every sequence is DNA
fn validate_code_table(catalog: &serde_json::Value, key: &str) -> usize {
    let Some(table) = catalog.get(key) else {
        return 0;
    };

    let table = table.as_object().unwrap_or_else(|| {
        panic!("\n\nCATALOG BUILD ERROR: '{key}' must be an object of code -> sequences\n");
    });

    for (code, value) in table {
        assert!(
            all_dna(value),
            "\n\nCATALOG BUILD ERROR: '{key}' entry '{code}' contains a non-ACGT sequence\n"
        );
    }

    table.len()
}

fn all_dna(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Array(items) => items.iter().all(all_dna),
        other => is_dna(other),
    }
}

fn is_dna(value: &serde_json::Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| !s.is_empty() && s.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T')))
}

fn set_build_dependencies() {
    // Tell cargo to rerun if catalog changes
    println!("cargo:rerun-if-changed=catalogs/index_tables.json");

    // Tell cargo to rerun if build.rs changes
    println!("cargo:rerun-if-changed=build.rs");
}
