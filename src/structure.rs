use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Component, Path};

use crate::error::{RepodocError, Result};

/// Files larger than this are treated as generated or vendored and skipped.
const MAX_FILE_BYTES: u64 = 512 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Rust,
    Python,
    Java,
    Kotlin,
    Scala,
    CSharp,
    Cpp,
    Go,
    JavaScript,
    TypeScript,
    Ruby,
    Swift,
}

impl Language {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Some(match ext.as_str() {
            "rs" => Self::Rust,
            "py" => Self::Python,
            "java" => Self::Java,
            "kt" | "kts" => Self::Kotlin,
            "scala" => Self::Scala,
            "cs" => Self::CSharp,
            "cc" | "cpp" | "cxx" | "hpp" | "hh" | "h" => Self::Cpp,
            "go" => Self::Go,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "rb" => Self::Ruby,
            "swift" => Self::Swift,
            _ => return None,
        })
    }

    /// Fence tag for Markdown code blocks.
    pub fn fence(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::Scala => "scala",
            Self::CSharp => "csharp",
            Self::Cpp => "cpp",
            Self::Go => "go",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Ruby => "ruby",
            Self::Swift => "swift",
        }
    }

    fn declarations(self) -> &'static Regex {
        match self {
            Self::Rust => &RUST_DECL,
            Self::Python => &PYTHON_DECL,
            Self::Java | Self::Kotlin | Self::Scala | Self::CSharp => &JVM_DECL,
            Self::Cpp => &CPP_DECL,
            Self::Go => &GO_DECL,
            Self::JavaScript | Self::TypeScript => &JS_DECL,
            Self::Ruby => &RUBY_DECL,
            Self::Swift => &SWIFT_DECL,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rust => "Rust",
            Self::Python => "Python",
            Self::Java => "Java",
            Self::Kotlin => "Kotlin",
            Self::Scala => "Scala",
            Self::CSharp => "C#",
            Self::Cpp => "C++",
            Self::Go => "Go",
            Self::JavaScript => "JavaScript",
            Self::TypeScript => "TypeScript",
            Self::Ruby => "Ruby",
            Self::Swift => "Swift",
        };
        f.write_str(name)
    }
}

// Every pattern captures `kind` and `name`.
static RUST_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?P<kind>struct|enum|trait|union)\s+(?P<name>[A-Za-z_]\w*)")
        .expect("valid regex")
});

static PYTHON_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?P<kind>class)\s+(?P<name>[A-Za-z_]\w*)").expect("valid regex")
});

static JVM_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:(?:public|private|protected|internal|abstract|final|static|sealed|data|open|partial|inner|case|enum|annotation|readonly)\s+)*(?P<kind>class|interface|enum|record|struct|object|trait)\s+(?P<name>[A-Za-z_]\w*)",
    )
    .expect("valid regex")
});

static CPP_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:template\s*<[^>]*>\s*)?(?P<kind>class|struct)\s+(?P<name>[A-Za-z_]\w*)\s*(?:final\s*)?(?:[:{]|$)",
    )
    .expect("valid regex")
});

static GO_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*type\s+(?P<name>[A-Za-z_]\w*)\s+(?P<kind>struct|interface)\b")
        .expect("valid regex")
});

static JS_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?(?P<kind>class|interface|enum)\s+(?P<name>[A-Za-z_$][\w$]*)",
    )
    .expect("valid regex")
});

static RUBY_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?P<kind>class|module)\s+(?P<name>[A-Z]\w*(?:::[A-Z]\w*)*)")
        .expect("valid regex")
});

static SWIFT_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:(?:public|private|fileprivate|internal|open|final)\s+)*(?P<kind>class|struct|enum|protocol|actor)\s+(?P<name>[A-Za-z_]\w*)",
    )
    .expect("valid regex")
});

/// A type declaration found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    /// Declaration keyword as written (`class`, `struct`, `trait`, ...)
    pub kind: String,
    /// 1-based line of the declaration
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct FileStructure {
    /// Path relative to the project root, `/`-separated
    pub path: String,
    pub language: Language,
    pub classes: Vec<ClassInfo>,
    pub source: String,
}

impl FileStructure {
    pub fn has_classes(&self) -> bool {
        !self.classes.is_empty()
    }
}

/// Produces the file-to-declarations map of a project.
pub trait StructureProvider: Send + Sync {
    /// Source files under `root`, ordered by relative path.
    fn analyze(&self, root: &Path) -> Result<Vec<FileStructure>>;
}

/// Walks a project tree honoring `.gitignore` and finds type declarations
/// with per-language patterns.
pub struct SourceScanner {
    excludes: GlobSet,
}

impl SourceScanner {
    pub fn new(exclude: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude {
            let glob = Glob::new(pattern).map_err(|e| {
                RepodocError::Config(format!("invalid exclude pattern {pattern:?}: {e}"))
            })?;
            builder.add(glob);
        }
        let excludes = builder
            .build()
            .map_err(|e| RepodocError::Config(format!("invalid exclude patterns: {e}")))?;
        Ok(Self { excludes })
    }

    fn scan_file(&self, root: &Path, path: &Path) -> Option<FileStructure> {
        let relative = relative_path(root, path)?;
        if self.excludes.is_match(&relative) {
            debug!("Excluded {relative}");
            return None;
        }
        let language = Language::from_path(path)?;

        let size = path.metadata().map(|m| m.len()).unwrap_or(0);
        if size > MAX_FILE_BYTES {
            debug!("Skipping {relative}: {size} bytes");
            return None;
        }

        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                debug!("Skipping {relative}: {e}");
                return None;
            }
        };

        Some(FileStructure {
            classes: find_declarations(language, &source),
            path: relative,
            language,
            source,
        })
    }
}

impl StructureProvider for SourceScanner {
    fn analyze(&self, root: &Path) -> Result<Vec<FileStructure>> {
        if !root.is_dir() {
            return Err(RepodocError::Structure(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let root = root.canonicalize()?;
        let walker = WalkBuilder::new(&root)
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if let Some(file) = self.scan_file(&root, entry.path()) {
                files.push(file);
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        info!(
            "Analyzed {} source files ({} with type declarations)",
            files.len(),
            files.iter().filter(|f| f.has_classes()).count()
        );
        Ok(files)
    }
}

pub fn find_declarations(language: Language, source: &str) -> Vec<ClassInfo> {
    language
        .declarations()
        .captures_iter(source)
        .filter_map(|caps| {
            let name = caps.name("name")?;
            let kind = caps.name("kind")?;
            Some(ClassInfo {
                name: name.as_str().to_string(),
                kind: kind.as_str().to_string(),
                line: source[..name.start()].matches('\n').count() + 1,
            })
        })
        .collect()
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Option<_>>()?;
    (!parts.is_empty()).then(|| parts.join("/"))
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    mod find_declarations {
        use super::*;

        fn names(language: Language, source: &str) -> Vec<(String, String)> {
            find_declarations(language, source)
                .into_iter()
                .map(|c| (c.kind, c.name))
                .collect()
        }

        #[test]
        fn test_rust() {
            let source = "use std::fmt;\n\npub struct Parser {\n}\n\nenum Token { A }\npub(crate) trait Visit {}\n// struct\n";
            assert_eq!(
                names(Language::Rust, source),
                vec![
                    ("struct".into(), "Parser".into()),
                    ("enum".into(), "Token".into()),
                    ("trait".into(), "Visit".into()),
                ]
            );
            assert_eq!(find_declarations(Language::Rust, source)[0].line, 3);
        }

        #[test]
        fn test_kotlin_enum_class() {
            let source = "enum class Color { RED }\ndata class Point(val x: Int)\n";
            assert_eq!(
                names(Language::Kotlin, source),
                vec![
                    ("class".into(), "Color".into()),
                    ("class".into(), "Point".into()),
                ]
            );
        }

        #[test]
        fn test_java_enum_and_interface() {
            let source = "public enum Mode { A }\npublic interface Shape {}\n";
            assert_eq!(
                names(Language::Java, source),
                vec![
                    ("enum".into(), "Mode".into()),
                    ("interface".into(), "Shape".into()),
                ]
            );
        }

        #[test]
        fn test_go_and_python() {
            assert_eq!(
                names(Language::Go, "type Server struct {\n}\ntype ID string\n"),
                vec![("struct".into(), "Server".into())]
            );
            assert_eq!(
                names(Language::Python, "class Foo(Base):\n    pass\n"),
                vec![("class".into(), "Foo".into())]
            );
        }

        #[test]
        fn test_cpp_ignores_forward_declarations() {
            let source = "class Widget;\nclass Button : public Widget {\n};\n";
            assert_eq!(
                names(Language::Cpp, source),
                vec![("class".into(), "Button".into())]
            );
        }

        #[test]
        fn test_typescript_exports() {
            let source = "export default class App {}\nexport interface Props {}\n";
            assert_eq!(
                names(Language::TypeScript, source),
                vec![
                    ("class".into(), "App".into()),
                    ("interface".into(), "Props".into()),
                ]
            );
        }
    }

    #[test]
    fn test_analyze_orders_by_path_and_skips_unknown_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/zeta.rs", "pub struct Zeta;\n");
        write(dir.path(), "src/alpha.py", "def f():\n    pass\n");
        write(dir.path(), "README.md", "# readme\n");

        let files = SourceScanner::new(&[]).unwrap().analyze(dir.path()).unwrap();

        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/alpha.py", "src/zeta.rs"]);
        assert!(!files[0].has_classes());
        assert_eq!(files[1].classes[0].name, "Zeta");
        assert_eq!(files[1].language, Language::Rust);
        assert!(files[1].source.contains("Zeta"));
    }

    #[test]
    fn test_analyze_applies_excludes_and_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".gitignore", "build/\n");
        write(dir.path(), "build/gen.rs", "struct Generated;\n");
        write(dir.path(), "tests/it.rs", "struct Fixture;\n");
        write(dir.path(), "src/lib.rs", "struct Kept;\n");

        let scanner = SourceScanner::new(&["tests/**".to_string()]).unwrap();
        let files = scanner.analyze(dir.path()).unwrap();

        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/lib.rs"]);
    }

    #[test]
    fn test_analyze_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SourceScanner::new(&[])
            .unwrap()
            .analyze(&dir.path().join("missing"));
        assert!(matches!(result, Err(RepodocError::Structure(_))));
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        let result = SourceScanner::new(&["src/[".to_string()]);
        assert!(matches!(result, Err(RepodocError::Config(_))));
    }
}
