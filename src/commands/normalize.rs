//! Whitespace normalization for note bodies (spec.md §8: `normalize` is
//! idempotent — `normalize(normalize(x)) == normalize(x)`).

/// Collapses runs of whitespace to a single space and trims the ends.
pub fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_internal_whitespace() {
        assert_eq!(normalize_text("hola   que    tal"), "hola que tal");
    }

    #[test]
    fn trims_ends() {
        assert_eq!(normalize_text("  hola  "), "hola");
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_text("  hola   mundo\t\n");
        let twice = normalize_text(&once);
        assert_eq!(once, twice);
    }
}
