//! Per-header remap rule generation.
//!
//! A remap lets a consuming binary swap out specific headers at build time.
//! For each remap-eligible header this module produces a `label_setting`
//! named `<base>_remap` whose default points at an empty library, and a macro
//! file body with three sections: a transition mapping remap keys to
//! attributes, a rule exposing those attributes plus `actual_binary`, and a
//! macro instantiating both while forwarding a consumer-supplied remap
//! dictionary keyed on the original header basename.
//!
//! Generation is deterministic: header order in the macro file mirrors the
//! input order.

mod error;

use std::fmt::Write as _;

use bazelify_buildfile::{LabelSetting, Library};
use bazelify_label::Label;

#[doc(inline)]
pub use crate::error::RemapError;

/// Name of the empty default library that remap settings point at.
pub const EMPTY_REMAP: &str = "bazelify_empty_remap";

/// One remap-eligible header, processed into its rule names and labels.
#[derive(Debug, Clone)]
struct Processed {
    /// The original header basename.
    header: String,
    /// The header basename without its extension.
    short_name: String,
    /// Label of the remap label setting, as a string.
    label: String,
    /// Label string the setting defaults to.
    build_setting_default: String,
}

/// Generated remap data: the default library, the per-header label settings,
/// and the macro file body.
#[derive(Debug, Clone)]
pub struct Remaps {
    libraries: Vec<Library>,
    label_settings: Vec<(String, LabelSetting)>,
    bzl_contents: String,
}

impl Remaps {
    /// Builds remap data from the configured header list.
    ///
    /// `sdk_from_workspace` is the workspace-relative directory of the SDK
    /// root, where all remap rules live.
    ///
    /// # Errors
    ///
    /// Returns a duplicate-header error when the same header is listed twice.
    pub fn new(
        headers: &[String],
        sdk_from_workspace: &str,
    ) -> Result<Self, RemapError> {
        let mut libraries = Vec::new();
        if !headers.is_empty() {
            libraries.push(Library {
                name: EMPTY_REMAP.to_string(),
                ..Default::default()
            });
        }

        let default_label =
            Label::from_parts(sdk_from_workspace, EMPTY_REMAP).to_string();
        let mut label_settings = Vec::new();
        let mut processed = Vec::new();
        for header in headers {
            if label_settings.iter().any(|(h, _)| h == header) {
                return Err(RemapError::duplicate_header(header));
            }
            let short_name = header
                .strip_suffix(".h")
                .unwrap_or(header.as_str())
                .to_string();
            let remap_name = format!("{short_name}_remap");
            label_settings.push((
                header.clone(),
                LabelSetting {
                    name: remap_name.clone(),
                    build_setting_default: default_label.clone(),
                },
            ));
            processed.push(Processed {
                header: header.clone(),
                short_name,
                label: Label::from_parts(sdk_from_workspace, remap_name)
                    .to_string(),
                build_setting_default: default_label.clone(),
            });
        }

        Ok(Self {
            libraries,
            label_settings,
            bzl_contents: bzl_contents(&processed),
        })
    }

    /// The libraries that need to be created (the empty default, when any
    /// remaps are declared).
    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    /// The label-setting rule for each header, in input order.
    pub fn label_settings(&self) -> &[(String, LabelSetting)] {
        &self.label_settings
    }

    /// The macro file's contents.
    pub fn bzl_contents(&self) -> &str {
        &self.bzl_contents
    }
}

/// Renders the macro file body. Byte-stable for a given input order.
fn bzl_contents(processed: &[Processed]) -> String {
    let mut out = String::new();
    out.push_str(
        r#""""Remaps library dependencies based on the remap_cc_binary that
includes the library.
"""
load("@rules_cc//cc:defs.bzl", "cc_binary")

def _remap_transition_impl(settings, attr):
    return {
"#,
    );
    for p in processed {
        writeln!(out, "        \"{}\": attr.{},", p.label, p.short_name)
            .unwrap();
    }
    out.push_str(
        r#"    }

_remap_transition = transition(
    implementation = _remap_transition_impl,
    inputs = [],
    outputs = [
"#,
    );
    for p in processed {
        writeln!(out, "        \"{}\",", p.label).unwrap();
    }
    out.push_str(
        r#"    ],
)

# Copies the cc_binary's output to its own output and propagates its
# runfiles and executable so "bazel run" works.
def _remap_rule_impl(ctx):
    actual_binary = ctx.attr.actual_binary[0]
    outfile = ctx.actions.declare_file(ctx.label.name)
    cc_binary_outfile = actual_binary[DefaultInfo].files.to_list()[0]
    ctx.actions.run_shell(
        inputs = [cc_binary_outfile],
        outputs = [outfile],
        command = "cp {} {}".format(cc_binary_outfile.path, outfile.path),
    )
    return [
        DefaultInfo(
            executable = outfile,
            data_runfiles = actual_binary[DefaultInfo].data_runfiles,
        ),
    ]

_remap_rule = rule(
    implementation = _remap_rule_impl,
    attrs = {
"#,
    );
    for p in processed {
        writeln!(out, "        \"{}\": attr.label(),", p.short_name).unwrap();
    }
    out.push_str(
        r#"        "actual_binary": attr.label(cfg = _remap_transition),
        "_whitelist_function_transition": attr.label(
            default = "@bazel_tools//tools/whitelists/function_transition_whitelist",
        ),
    },
    executable = True,
)

def remap_cc_binary(name, remap = None, **kwargs):
    """A cc_binary with remappable dependencies.

    Args:
        name: string name of the binary.
        remap: dict of header names to replacement targets.
        **kwargs: args passed to the underlying cc_binary rule.
    """
    cc_binary_name = name + "_native_binary"
    _remap_rule(
        name = name,
        actual_binary = ":{}".format(cc_binary_name),
"#,
    );
    for p in processed {
        writeln!(
            out,
            "        {} = remap.get(\"{}\", \"{}\"),",
            p.short_name, p.header, p.build_setting_default
        )
        .unwrap();
    }
    out.push_str(
        r#"    )
    cc_binary(
        name = cc_binary_name,
        **kwargs
    )
"#,
    );
    out
}
