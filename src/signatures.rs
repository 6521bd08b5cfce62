//! Literal signatures of the Shai-Hulud 2.0 worm.
//!
//! These lists are plain data. The manifest checker and the pattern scanner
//! receive a [`Signatures`] value at construction time, so tests can swap in
//! their own set.

/// Literal tokens, filenames and script heuristics used by the checkers.
#[derive(Debug, Clone)]
pub struct Signatures {
    /// Tokens whose presence anywhere in scanned text is a CRITICAL indicator.
    pub malicious_tokens: Vec<String>,
    /// Payload filenames dropped by the worm.
    pub malicious_filenames: Vec<String>,
    /// Workflow filenames planted by the worm.
    pub malicious_workflow_filenames: Vec<String>,
    /// Regex sources matched against every manifest script.
    pub suspicious_script_patterns: Vec<String>,
    /// Scripts npm runs automatically on install.
    pub lifecycle_scripts: Vec<String>,
    /// Lower-case keywords that make a lifecycle script suspicious.
    pub lifecycle_keywords: Vec<String>,
    /// Markers in a `repository` URL that identify a worm-created repo.
    pub repository_markers: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Signatures {
    fn default() -> Self {
        Self {
            malicious_tokens: owned(&[
                "setup_bun.js",
                "bun_environment.js",
                "SHA1HULUD",
                "Sha1-Hulud",
                "Shai-Hulud",
            ]),
            malicious_filenames: owned(&["setup_bun.js", "bun_environment.js"]),
            malicious_workflow_filenames: owned(&["discussion.yaml", "discussion.yml"]),
            suspicious_script_patterns: owned(&[
                r"curl.*https?://[^\s]+",
                r"wget.*https?://[^\s]+",
                r"bash.*<<.*EOF",
                r"node.*setup_bun",
                r"bun.*bun_environment",
                r"npm.*publish",
            ]),
            lifecycle_scripts: owned(&["preinstall", "install", "postinstall"]),
            lifecycle_keywords: owned(&["curl", "wget", "bun", "github"]),
            repository_markers: owned(&["Sha1-Hulud", "SHA1HULUD"]),
        }
    }
}

impl Signatures {
    /// Tokens from [`Self::malicious_tokens`] contained in `text`, in list order.
    pub fn tokens_in<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.malicious_tokens
            .iter()
            .map(String::as_str)
            .filter(move |token| text.contains(token))
    }

    pub fn is_malicious_filename(&self, name: &str) -> bool {
        self.malicious_filenames.iter().any(|f| f == name)
    }

    pub fn is_malicious_workflow_filename(&self, name: &str) -> bool {
        self.malicious_workflow_filenames.iter().any(|f| f == name)
    }

    pub fn is_lifecycle_script(&self, name: &str) -> bool {
        self.lifecycle_scripts.iter().any(|s| s == name)
    }
}
