// tests/resolution.rs

//! Integration tests for locked plugin resolution.
//!
//! These tests verify that:
//! 1. Resolving the same declarations twice yields identical results
//! 2. A failing declaration is reported by locator without stopping the others
//! 3. Custom resolvers replace the defaults and defaults are tried in order
//! 4. Checksums are enforced for the current platform

#![cfg(unix)]

mod common;

use common::{locator, Fixture};
use kiln::artifact::{ArtifactDeclaration, Resolver, TemplateResolver};
use kiln::cache;
use kiln::hash::Checksum;
use kiln::plugin::{resolve_plugins, PluginDeclaration, PluginsParam};
use kiln::{Error, OsArch};
use std::fs;
use std::sync::Arc;

fn declare(s: &str) -> PluginDeclaration {
    PluginDeclaration::new(ArtifactDeclaration::new(locator(s)))
}

#[test]
fn test_resolution_is_deterministic() {
    let fixture = Fixture::new();
    fixture.publish_plugin(&locator("org:beta:1.0"), &["b1", "b2"], None);
    fixture.publish_plugin(&locator("org:alpha:1.0"), &["a1"], Some("alpha.toml"));
    fixture.publish_asset(&locator("org:alpha-asset:1.0"), b"asset");

    let param = PluginsParam {
        default_resolvers: vec![fixture.resolver()],
        plugins: vec![
            declare("org:beta:1.0"),
            declare("org:alpha:1.0")
                .with_asset(ArtifactDeclaration::new(locator("org:alpha-asset:1.0"))),
        ],
    };
    let platform = OsArch::current();

    let first = resolve_plugins(&fixture.dirs, &platform, &param).unwrap();
    // Second run finds everything already unpacked
    let second = resolve_plugins(&fixture.dirs, &platform, &param).unwrap();
    // Third run starts from an empty home
    let third = resolve_plugins(&fixture.other_dirs("home2"), &platform, &param).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(cache::encode(&first).unwrap(), cache::encode(&third).unwrap());

    let keys: Vec<String> = first.keys().map(ToString::to_string).collect();
    assert_eq!(keys, vec!["org:alpha:1.0", "org:beta:1.0"]);
}

#[test]
fn test_failed_declaration_named_by_locator() {
    let fixture = Fixture::new();
    fixture.publish_plugin(&locator("org:first:1.0"), &["one"], None);
    fixture.publish_plugin(&locator("org:third:1.0"), &["three"], None);

    let param = PluginsParam {
        default_resolvers: vec![fixture.resolver()],
        plugins: vec![
            declare("org:first:1.0"),
            declare("org:second:1.0"),
            declare("org:third:1.0"),
        ],
    };

    let err = resolve_plugins(&fixture.dirs, &OsArch::current(), &param).unwrap_err();
    let Error::Resolution(errors) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.locators().collect::<Vec<_>>(), vec![&locator("org:second:1.0")]);
    assert!(matches!(
        errors.get(&locator("org:second:1.0")),
        Some(Error::ResolverExhausted { .. })
    ));

    let msg = err.to_string();
    assert!(
        msg.starts_with("failed to resolve 1 plugin(s):\n    failed to resolve org:second:1.0"),
        "{}",
        msg
    );

    // The declarations around the failure were still resolved
    assert!(fixture.dirs.plugins.join("org-first-1.0").is_file());
    assert!(fixture.dirs.plugins.join("org-third-1.0").is_file());
}

#[test]
fn test_no_resolver_available() {
    let fixture = Fixture::new();
    let param = PluginsParam {
        default_resolvers: Vec::new(),
        plugins: vec![declare("org:lonely:1.0")],
    };

    let err = resolve_plugins(&fixture.dirs, &OsArch::current(), &param).unwrap_err();
    assert!(err.to_string().contains("no resolvers available"), "{}", err);
}

#[test]
fn test_default_resolvers_tried_in_order() {
    let fixture = Fixture::new();
    fixture.publish_plugin(&locator("org:tool:1.0"), &["lint"], None);

    let missing: Arc<dyn Resolver> =
        Arc::new(TemplateResolver::new("/nonexistent/{{Product}}.tgz").unwrap());
    let param = PluginsParam {
        default_resolvers: vec![missing, fixture.resolver()],
        plugins: vec![declare("org:tool:1.0")],
    };

    let resolved = resolve_plugins(&fixture.dirs, &OsArch::current(), &param).unwrap();
    assert!(resolved.contains_key(&locator("org:tool:1.0")));
}

#[test]
fn test_custom_resolver_replaces_defaults() {
    let fixture = Fixture::new();
    fixture.publish_plugin(&locator("org:tool:1.0"), &["lint"], None);

    let broken = Arc::new(TemplateResolver::new("/nonexistent/{{Product}}.tgz").unwrap());
    let param = PluginsParam {
        default_resolvers: vec![fixture.resolver()],
        plugins: vec![PluginDeclaration::new(
            ArtifactDeclaration::new(locator("org:tool:1.0")).with_resolver(broken),
        )],
    };

    let err = resolve_plugins(&fixture.dirs, &OsArch::current(), &param).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/tool.tgz"), "{}", err);
}

#[test]
fn test_checksum_enforced_for_current_platform() {
    let fixture = Fixture::new();
    let plugin = locator("org:tool:1.0");
    let actual = fixture.publish_plugin(&plugin, &["lint"], None);
    let wrong = Checksum::parse(&"0".repeat(64)).unwrap();

    // A mismatching checksum for another platform is ignored
    let other_platform = OsArch::new("plan9", "mips");
    let param = PluginsParam {
        default_resolvers: vec![fixture.resolver()],
        plugins: vec![PluginDeclaration::new(
            ArtifactDeclaration::new(plugin.clone())
                .with_checksum(other_platform, wrong.clone())
                .with_checksum(
                    OsArch::current(),
                    Checksum::parse(&actual.to_uppercase()).unwrap(),
                ),
        )],
    };
    resolve_plugins(&fixture.dirs, &OsArch::current(), &param).unwrap();

    // A mismatch for this platform fails and removes the file
    let fresh = fixture.other_dirs("home2");
    let param = PluginsParam {
        default_resolvers: vec![fixture.resolver()],
        plugins: vec![PluginDeclaration::new(
            ArtifactDeclaration::new(plugin.clone()).with_checksum(OsArch::current(), wrong),
        )],
    };
    let err = resolve_plugins(&fresh, &OsArch::current(), &param).unwrap_err();
    let Error::Resolution(errors) = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(matches!(errors.get(&plugin), Some(Error::ChecksumMismatch { .. })));
    assert!(!fresh.plugins.join("org-tool-1.0").exists());
}

#[test]
fn test_invalid_plugin_info_is_a_failure() {
    let fixture = Fixture::new();
    let plugin = locator("org:liar:1.0");
    // Claims to be a different plugin
    let script = common::plugin_script(&locator("org:other:1.0"), &["x"], None);
    common::publish(&fixture.repo, &plugin, script.as_bytes());

    let param = PluginsParam {
        default_resolvers: vec![fixture.resolver()],
        plugins: vec![declare("org:liar:1.0")],
    };
    let err = resolve_plugins(&fixture.dirs, &OsArch::current(), &param).unwrap_err();
    let Error::Resolution(errors) = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(matches!(errors.get(&plugin), Some(Error::PluginInfoError { .. })));
}

#[test]
fn test_broken_archive_is_a_failure() {
    let fixture = Fixture::new();
    let plugin = locator("org:broken:1.0");
    let name = format!("org-broken-1.0-{}.tgz", OsArch::current());
    fs::write(fixture.repo.join(name), b"not a gzip stream").unwrap();

    let param = PluginsParam {
        default_resolvers: vec![fixture.resolver()],
        plugins: vec![declare("org:broken:1.0")],
    };
    let err = resolve_plugins(&fixture.dirs, &OsArch::current(), &param).unwrap_err();
    let Error::Resolution(errors) = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(matches!(errors.get(&plugin), Some(Error::ArchiveError { .. })));
    assert!(!fixture.dirs.plugins.join("org-broken-1.0").exists());
}
