//! Compiles `data/*.json` family tables into `$OUT_DIR/builtins.rs`.

use serde::Deserialize;
use std::fmt::Write as _;
use std::{env, fs, path::Path};

const FAMILY_FILES: &[(&str, &str)] = &[("TAG16H5", "tag16h5.json"), ("TAG36H11", "tag36h11.json")];

#[derive(Deserialize)]
struct FamilyTable {
    name: String,
    width_at_border: u32,
    total_width: u32,
    reversed_border: bool,
    min_hamming: u32,
    bit_locations: Vec<[i32; 2]>,
    codes: Vec<String>,
}

fn parse_code(raw: &str, file: &str) -> u64 {
    let digits = raw.trim_start_matches("0x");
    u64::from_str_radix(digits, 16)
        .unwrap_or_else(|e| panic!("{file}: invalid code `{raw}`: {e}"))
}

fn main() {
    let manifest = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR");
    let data_dir = Path::new(&manifest).join("data");
    println!("cargo:rerun-if-changed=data");

    let mut out = String::new();
    out.push_str("// @generated by build.rs from data/*.json\n\n");

    for (ident, file) in FAMILY_FILES {
        let path = data_dir.join(file);
        println!("cargo:rerun-if-changed={}", path.display());
        let raw = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("reading {}: {e}", path.display()));
        let table: FamilyTable =
            serde_json::from_str(&raw).unwrap_or_else(|e| panic!("parsing {file}: {e}"));
        assert!(
            table.bit_locations.len() <= 64,
            "{file}: more than 64 coded bits"
        );

        writeln!(out, "/// `{}` family ({} codes).", table.name, table.codes.len()).unwrap();
        writeln!(out, "pub static {ident}: TagFamily = TagFamily {{").unwrap();
        writeln!(out, "    name: Cow::Borrowed({:?}),", table.name).unwrap();
        writeln!(out, "    width_at_border: {},", table.width_at_border).unwrap();
        writeln!(out, "    total_width: {},", table.total_width).unwrap();
        writeln!(out, "    reversed_border: {},", table.reversed_border).unwrap();
        writeln!(out, "    min_hamming: {},", table.min_hamming).unwrap();
        out.push_str("    bit_locations: Cow::Borrowed(&[\n");
        for [x, y] in &table.bit_locations {
            writeln!(out, "        BitLocation::new({x}, {y}),").unwrap();
        }
        out.push_str("    ]),\n    codes: Cow::Borrowed(&[\n");
        for code in &table.codes {
            writeln!(out, "        {:#x},", parse_code(code, file)).unwrap();
        }
        out.push_str("    ]),\n};\n\n");
    }

    let idents: Vec<String> = FAMILY_FILES.iter().map(|(i, _)| format!("&{i}")).collect();
    writeln!(
        out,
        "/// Every embedded family, in registry order.\npub static BUILTIN_FAMILIES: [&TagFamily; {}] = [{}];",
        FAMILY_FILES.len(),
        idents.join(", ")
    )
    .unwrap();

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR");
    fs::write(Path::new(&out_dir).join("builtins.rs"), out).expect("write builtins.rs");
}
