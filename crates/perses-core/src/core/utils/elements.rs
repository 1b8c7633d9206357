use phf::{Map, phf_map};

/// Single-bond covalent radii in nanometers.
static COVALENT_RADII_NM: Map<&'static str, f64> = phf_map! {
    "H" => 0.031, "D" => 0.031, "T" => 0.031,
    "B" => 0.084, "C" => 0.076, "N" => 0.071, "O" => 0.066, "F" => 0.057,
    "Na" => 0.166, "Mg" => 0.141, "Si" => 0.111, "P" => 0.107, "S" => 0.105, "Cl" => 0.102,
    "K" => 0.203, "Ca" => 0.176, "Zn" => 0.122, "Se" => 0.120, "Br" => 0.120, "I" => 0.139,
};

const FALLBACK_COVALENT_RADIUS_NM: f64 = 0.075;

pub fn normalize_symbol(symbol: &str) -> String {
    let mut chars = symbol.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// Guesses an element from a PDB-style atom name ("HB2" -> "H", "1HD1" -> "H").
pub fn element_from_atom_name(name: &str) -> String {
    name.trim()
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}

pub fn is_hydrogen_symbol(symbol: &str) -> bool {
    matches!(symbol.trim(), "H" | "D" | "T")
}

pub fn covalent_radius_nm(symbol: &str) -> f64 {
    COVALENT_RADII_NM
        .get(symbol)
        .copied()
        .unwrap_or(FALLBACK_COVALENT_RADIUS_NM)
}
