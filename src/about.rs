pub const SABERPLISH_DISPLAY_VERSION: &str = env!("SABERPLISH_DISPLAY_VERSION");
pub const SABERPLISH_BUILD_N: &str = env!("SABERPLISH_BUILD_N");

pub fn version_cli_text() -> String {
    format!(
        "saberplish {}\nBuild {}\nSABER-PLISH probe design and hybridization reports",
        SABERPLISH_DISPLAY_VERSION, SABERPLISH_BUILD_N
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_text_mentions_build() {
        let text = version_cli_text();
        assert!(text.starts_with("saberplish "));
        assert!(text.contains(SABERPLISH_BUILD_N));
    }
}
