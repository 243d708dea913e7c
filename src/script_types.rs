//! Static script type table.
//!
//! A fixed ordered list of immutable descriptors, built once at startup:
//! each type carries its extensions, a pure filename -> default command
//! builder, and a boilerplate template for newly created files. The Makefile
//! type registers zero extensions; targets are discovered by the dedicated
//! Makefile pass rather than extension matching.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Immutable descriptor for one runnable script type.
pub struct ScriptType {
    /// Stable kind tag ("shell", "python", ...)
    pub tag: &'static str,
    /// Human label for group headings
    pub label: &'static str,
    /// Recognized file extensions, lowercase, no dot
    pub extensions: &'static [&'static str],
    /// Pure filename -> default invocation builder
    build_command: fn(&str) -> String,
    /// Template written into newly created script files
    pub boilerplate: &'static str,
}

impl ScriptType {
    /// Default invocation for a file of this type.
    pub fn default_command(&self, filename: &str) -> String {
        (self.build_command)(filename)
    }

    /// Whether this type participates in generic extension matching.
    pub fn has_extensions(&self) -> bool {
        !self.extensions.is_empty()
    }
}

/// The fixed, ordered type table. Order is the display order of file-type
/// groups in the tree.
pub static SCRIPT_TYPES: &[ScriptType] = &[
    ScriptType {
        tag: "shell",
        label: "Shell",
        extensions: &["sh", "bash"],
        build_command: |f| format!("bash {}", f),
        boilerplate: "#!/bin/bash\n\n",
    },
    ScriptType {
        tag: "python",
        label: "Python",
        extensions: &["py"],
        build_command: |f| format!("python3 {}", f),
        boilerplate: "#!/usr/bin/env python3\n\n",
    },
    ScriptType {
        tag: "node",
        label: "Node",
        extensions: &["js", "mjs", "cjs"],
        build_command: |f| format!("node {}", f),
        boilerplate: "#!/usr/bin/env node\n\n",
    },
    ScriptType {
        tag: "typescript",
        label: "TypeScript",
        extensions: &["ts"],
        build_command: |f| format!("npx tsx {}", f),
        boilerplate: "",
    },
    ScriptType {
        tag: "ruby",
        label: "Ruby",
        extensions: &["rb"],
        build_command: |f| format!("ruby {}", f),
        boilerplate: "#!/usr/bin/env ruby\n\n",
    },
    ScriptType {
        tag: "perl",
        label: "Perl",
        extensions: &["pl"],
        build_command: |f| format!("perl {}", f),
        boilerplate: "#!/usr/bin/env perl\n\n",
    },
    ScriptType {
        tag: "php",
        label: "PHP",
        extensions: &["php"],
        build_command: |f| format!("php {}", f),
        boilerplate: "<?php\n\n",
    },
    ScriptType {
        tag: "powershell",
        label: "PowerShell",
        extensions: &["ps1"],
        build_command: |f| format!("pwsh {}", f),
        boilerplate: "",
    },
    // Zero extensions: excluded from generic file matching, used by the
    // dedicated Makefile discovery pass for labels and target commands.
    ScriptType {
        tag: "make",
        label: "Makefile",
        extensions: &[],
        build_command: |target| format!("make {}", target),
        boilerplate: "",
    },
];

/// Extension -> type lookup, built once at startup.
static EXTENSION_INDEX: LazyLock<HashMap<&'static str, &'static ScriptType>> =
    LazyLock::new(|| {
        let mut index = HashMap::new();
        for script_type in SCRIPT_TYPES {
            for ext in script_type.extensions {
                index.insert(*ext, script_type);
            }
        }
        index
    });

/// Look up the script type for a file extension (lowercase, no dot).
pub fn type_for_extension(ext: &str) -> Option<&'static ScriptType> {
    EXTENSION_INDEX.get(ext).copied()
}

/// Look up a script type by its kind tag.
pub fn type_for_tag(tag: &str) -> Option<&'static ScriptType> {
    SCRIPT_TYPES.iter().find(|t| t.tag == tag)
}

/// The Makefile descriptor, used by the dedicated discovery pass.
pub fn make_type() -> &'static ScriptType {
    type_for_tag("make").expect("make type is in the static table")
}
