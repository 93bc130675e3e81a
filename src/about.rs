pub const CODEMLP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CODEMLP_BUILD_N: &str = env!("CODEMLP_BUILD_N");

pub fn version_cli_text() -> String {
    format!(
        "codemlp {}\nBuild {}\nPer-site dN/dS statistics from codeml site-model reports",
        CODEMLP_VERSION, CODEMLP_BUILD_N
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_text() {
        let text = version_cli_text();
        assert!(text.starts_with(&format!("codemlp {CODEMLP_VERSION}\n")));
        assert!(text.contains("Build "));
    }
}
