use std::collections::BTreeMap;
use std::fmt;

/// The target language a `namespace` declaration applies to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NamespaceScope {
    /// `namespace * ...`, the program-wide default.
    All,
    Cpp,
    Java,
    Py,
    PyTwisted,
    Perl,
    Rb,
    Cocoa,
    Csharp,
    Php,
    SmalltalkCategory,
    SmalltalkPrefix,
    Js,
    St,
    Go,
    Rs,
    Kotlin,
    Swift,
    /// Scopes this compiler does not know about are kept verbatim.
    Other(String),
}

impl NamespaceScope {
    pub fn from_name(name: &str) -> Self {
        match name {
            "*" => Self::All,
            "cpp" => Self::Cpp,
            "java" => Self::Java,
            "py" => Self::Py,
            "py.twisted" => Self::PyTwisted,
            "perl" => Self::Perl,
            "rb" => Self::Rb,
            "cocoa" => Self::Cocoa,
            "csharp" => Self::Csharp,
            "php" => Self::Php,
            "smalltalk.category" => Self::SmalltalkCategory,
            "smalltalk.prefix" => Self::SmalltalkPrefix,
            "js" => Self::Js,
            "st" => Self::St,
            "go" => Self::Go,
            "rs" => Self::Rs,
            "kotlin" | "kt" => Self::Kotlin,
            "swift" => Self::Swift,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::All => "*",
            Self::Cpp => "cpp",
            Self::Java => "java",
            Self::Py => "py",
            Self::PyTwisted => "py.twisted",
            Self::Perl => "perl",
            Self::Rb => "rb",
            Self::Cocoa => "cocoa",
            Self::Csharp => "csharp",
            Self::Php => "php",
            Self::SmalltalkCategory => "smalltalk.category",
            Self::SmalltalkPrefix => "smalltalk.prefix",
            Self::Js => "js",
            Self::St => "st",
            Self::Go => "go",
            Self::Rs => "rs",
            Self::Kotlin => "kotlin",
            Self::Swift => "swift",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for NamespaceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Namespace declarations by scope.
pub type Namespaces = BTreeMap<NamespaceScope, String>;

/// Looks up the namespace for `scope`, falling back to the `*` default.
pub fn namespace_for_scope<'n>(namespaces: &'n Namespaces, scope: &NamespaceScope) -> Option<&'n str> {
    namespaces
        .get(scope)
        .or_else(|| namespaces.get(&NamespaceScope::All))
        .map(String::as_str)
}
