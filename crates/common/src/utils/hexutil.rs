/// Lower-cases a `0x`-prefixed hex string, the canonical form used for
/// addresses and hashes once they cross the persistence boundary.
///
/// Checksummed addresses are used anywhere the node protocol expects them;
/// storage keys are always lower-case so lookups don't need to re-checksum.
pub fn to_lower_hex(value: impl AsRef<str>) -> String {
    value.as_ref().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_mixed_case_hex() {
        assert_eq!(to_lower_hex("0xAbCd1234"), "0xabcd1234");
    }
}
