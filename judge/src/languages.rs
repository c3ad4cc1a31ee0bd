//! This module implements the language registry and resolver used by the
//! judge.
//!
//! The registry is a fixed, ordered sequence of language descriptors defined
//! at compile time. Resolution walks the sequence in declaration order and
//! the first matching entry wins; nothing is registered dynamically, and an
//! unknown extension always fails. Supporting a new language means adding one
//! registry entry and nothing else.
//!

use std::path::Path;

use crate::{ErrorKind, Result};

/// The immutable descriptor binding a language to its command templates and
/// recognized file extensions.
#[derive(Debug)]
pub struct Language {
    /// The name of the language, matched case-insensitively against explicit
    /// language hints.
    pub name: &'static str,

    /// Template of the command line compiling a source file, with `{source}`
    /// and `{executable}` placeholders. Empty for interpreted languages,
    /// which skip compilation entirely.
    compile: &'static str,

    /// Template of the command line executing the program.
    execute: &'static str,

    /// File extensions recognized as sources of this language, without the
    /// leading dot.
    pub extensions: &'static [&'static str]
}

/// The language registry. Declaration order is the only tie-break: when a
/// source could match several entries, the first one wins.
pub const LANGUAGES: &[Language] = &[
    Language {
        name: "Bash",
        compile: "",
        execute: "bash {source}",
        extensions: &["sh"]
    },
    Language {
        name: "C",
        compile: "gcc -std=gnu99 -o {executable} {source} -lm",
        execute: "./{executable}",
        extensions: &["c"]
    },
    Language {
        name: "C++",
        compile: "g++ -std=gnu++11 -o {executable} {source} -lm",
        execute: "./{executable}",
        extensions: &["cc", "cpp"]
    },
    Language {
        name: "Go",
        compile: "go build {source}",
        execute: "go run {source}",
        extensions: &["go"]
    },
    Language {
        name: "Java",
        compile: "javac {source}",
        execute: "java -cp . {executable}",
        extensions: &["java"]
    },
    Language {
        name: "JavaScript",
        compile: "",
        execute: "nodejs {source}",
        extensions: &["js"]
    },
    Language {
        name: "Perl",
        compile: "",
        execute: "perl {source}",
        extensions: &["pl"]
    },
    Language {
        name: "Python 2",
        compile: "",
        execute: "python2.7 {source}",
        extensions: &["py"]
    },
    Language {
        name: "Python 3",
        compile: "",
        execute: "python3.5 {source}",
        extensions: &["py3"]
    },
    Language {
        name: "Ruby",
        compile: "",
        execute: "ruby {source}",
        extensions: &["rb"]
    },
    Language {
        name: "Swift",
        compile: "/opt/swift-3.1.1/bin/swiftc {source}",
        execute: "./{executable}",
        extensions: &["swift"]
    },
];

impl Language {
    /// Whether sources of this language are executed directly, without a
    /// compilation step.
    pub fn is_interpreted(&self) -> bool {
        self.compile.is_empty()
    }

    /// Resolve the compile command for the given program. Returns `None` for
    /// interpreted languages, which need not be compiled before execution.
    pub fn compile_command(&self, source: &Path, executable: &str) -> Option<String> {
        if self.is_interpreted() {
            None
        } else {
            Some(fill_template(self.compile, source, executable))
        }
    }

    /// Resolve the execute command for the given program.
    pub fn execute_command(&self, source: &Path, executable: &str) -> String {
        fill_template(self.execute, source, executable)
    }
}

/// Substitute the `{source}` and `{executable}` placeholders of a command
/// template.
fn fill_template(template: &str, source: &Path, executable: &str) -> String {
    template
        .replace("{source}", &source.to_string_lossy())
        .replace("{executable}", executable)
}

/// The base name of the executable artifact produced for the given source
/// file: its file name with the extension stripped.
pub fn executable_name(source: &Path) -> String {
    source.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Select the registry entry for the given source file.
///
/// Entries are tried in declaration order. The first entry whose extension
/// set contains the source's extension, or whose name equals the explicit
/// hint ignoring case, is returned; either match suffices on its own. No
/// entry matching means the language is unsupported.
pub fn resolve(source: &Path, explicit_name: Option<&str>) -> Result<&'static Language> {
    let extension = source.extension().and_then(|ext| ext.to_str());

    for language in LANGUAGES {
        let matches_extension = extension
            .map_or(false, |ext| language.extensions.contains(&ext));
        let matches_name = explicit_name
            .map_or(false, |name| name.eq_ignore_ascii_case(language.name));

        if matches_extension || matches_name {
            return Ok(language);
        }
    }

    bail!(ErrorKind::UnsupportedLanguage(source.display().to_string()))
}


#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    #[test]
    fn test_every_registered_extension_resolves() {
        for language in LANGUAGES {
            for extension in language.extensions {
                let source = PathBuf::from(format!("program.{}", extension));
                let resolved = resolve(&source, None).unwrap();
                assert_eq!(resolved.name, language.name);
            }
        }
    }

    #[test]
    fn test_unknown_extension_fails() {
        assert!(resolve(Path::new("program.xyz"), None).is_err());
    }

    #[test]
    fn test_missing_extension_fails() {
        assert!(resolve(Path::new("program"), None).is_err());
    }

    #[test]
    fn test_explicit_name_matches_case_insensitively() {
        let resolved = resolve(Path::new("program.xyz"), Some("RUBY")).unwrap();
        assert_eq!(resolved.name, "Ruby");
    }

    #[test]
    fn test_first_matching_entry_wins() {
        // The extension matches an entry declared before the hinted one.
        let resolved = resolve(Path::new("program.c"), Some("Ruby")).unwrap();
        assert_eq!(resolved.name, "C");
    }

    #[test]
    fn test_interpreted_languages_have_no_compile_command() {
        let bash = resolve(Path::new("script.sh"), None).unwrap();
        assert!(bash.is_interpreted());
        assert_eq!(bash.compile_command(Path::new("script.sh"), "script"), None);
    }

    #[test]
    fn test_command_templates_resolve_placeholders() {
        let c = resolve(Path::new("solution.c"), None).unwrap();
        assert_eq!(
            c.compile_command(Path::new("solution.c"), "solution").unwrap(),
            "gcc -std=gnu99 -o solution solution.c -lm");
        assert_eq!(c.execute_command(Path::new("solution.c"), "solution"), "./solution");
    }

    #[test]
    fn test_executable_name_strips_the_extension() {
        assert_eq!(executable_name(Path::new("solutions/solution.cc")), "solution");
        assert_eq!(executable_name(Path::new("script.py")), "script");
    }
}
