use phf::{Map, Set, phf_map, phf_set};

/// The twenty canonical amino acids, in alphabetical order of their three-letter codes.
pub const AMINO_ACIDS: [&str; 20] = [
    "ALA", "ARG", "ASN", "ASP", "CYS", "GLN", "GLU", "GLY", "HIS", "ILE", "LEU", "LYS", "MET",
    "PHE", "PRO", "SER", "THR", "TRP", "TYR", "VAL",
];

/// Neutral histidine tautomers a generic `HIS` is expanded into.
pub const HISTIDINE_TAUTOMERS: [&str; 2] = ["HIE", "HID"];

static ONE_TO_THREE: Map<char, &'static str> = phf_map! {
    'A' => "ALA", 'C' => "CYS", 'D' => "ASP", 'E' => "GLU", 'F' => "PHE",
    'G' => "GLY", 'H' => "HIS", 'I' => "ILE", 'K' => "LYS", 'L' => "LEU",
    'M' => "MET", 'N' => "ASN", 'P' => "PRO", 'Q' => "GLN", 'R' => "ARG",
    'S' => "SER", 'T' => "THR", 'V' => "VAL", 'W' => "TRP", 'Y' => "TYR",
};

static HISTIDINE_NAMES: Set<&'static str> = phf_set! { "HIS", "HIE", "HID", "HIP" };

/// Maps a one-letter amino-acid code to its three-letter residue name.
pub fn three_letter_code(one_letter: char) -> Option<&'static str> {
    ONE_TO_THREE.get(&one_letter.to_ascii_uppercase()).copied()
}

/// Collapses protonation variants onto their canonical residue name.
pub fn canonical_residue_name(name: &str) -> &str {
    if HISTIDINE_NAMES.contains(name) {
        "HIS"
    } else {
        name
    }
}

pub fn is_histidine(name: &str) -> bool {
    HISTIDINE_NAMES.contains(name)
}
