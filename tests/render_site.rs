//! End-to-end render scenarios against real site trees on disk.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use skiff::render::{DiscoverError, RenderError, Site};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn set_mtime(path: &Path, time: SystemTime) {
    filetime::set_file_mtime(path, FileTime::from_system_time(time)).unwrap();
}

fn site(root: &Path) -> Site {
    Site::new(root).with_workers(2)
}

#[test]
fn minimal_site_renders_titles_and_navigation() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "input/index.md", "# Home\n");
    write(dir.path(), "input/about.md", "# About\n");
    write(
        dir.path(),
        "config/body.html",
        "  <body>\n{{path_nav()}}\n@content@\n  </body>",
    );

    let pass = site(dir.path()).render(false).unwrap();
    assert_eq!(pass.rendered, 2);

    let index = fs::read_to_string(dir.path().join("output/index.html")).unwrap();
    assert!(index.contains("<title>Home</title>"), "{index}");

    let about = fs::read_to_string(dir.path().join("output/about.html")).unwrap();
    assert!(about.contains("<title>About</title>"), "{about}");
    // The parent-navigation trail links back to the index under its title.
    assert!(
        about.contains("<a href=\"/index.html\">Home</a>"),
        "{about}"
    );
}

#[test]
fn second_render_is_idempotent_and_renders_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "input/index.md", "# Home\n");
    write(dir.path(), "input/about.md", "# About\n");
    write(dir.path(), "input/logo.bin", "binary bytes");

    let first = site(dir.path()).render(false).unwrap();
    assert_eq!(first.rendered, 3);

    let index_before = fs::read_to_string(dir.path().join("output/index.html")).unwrap();

    let second = site(dir.path()).render(false).unwrap();
    assert_eq!(second.rendered, 0);
    assert_eq!(second.unchanged(), 3);

    let index_after = fs::read_to_string(dir.path().join("output/index.html")).unwrap();
    assert_eq!(index_before, index_after);
}

#[test]
fn force_renders_everything_again() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "input/index.md", "# Home\n");

    site(dir.path()).render(false).unwrap();
    let forced = site(dir.path()).render(true).unwrap();
    assert_eq!(forced.rendered, 1);
}

#[test]
fn modified_input_is_rerendered() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "input/index.md", "# Home\n");

    site(dir.path()).render(false).unwrap();

    write(dir.path(), "input/index.md", "# New Home\n");
    set_mtime(
        &dir.path().join("input/index.md"),
        SystemTime::now() + Duration::from_secs(5),
    );

    let pass = site(dir.path()).render(false).unwrap();
    assert_eq!(pass.rendered, 1);

    let index = fs::read_to_string(dir.path().join("output/index.html")).unwrap();
    assert!(index.contains("New Home"));
}

#[test]
fn duplicate_index_files_abort_discovery() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "input/index.md", "# A\n");
    write(dir.path(), "input/index.html", "<h1>B</h1>\n");

    let err = site(dir.path()).render(false).unwrap_err();
    assert!(matches!(
        err,
        RenderError::Discover(DiscoverError::DuplicateIndex { .. })
    ));
    assert!(!dir.path().join("output").exists());
}

#[test]
fn header_error_fails_the_render_and_writes_nothing_for_that_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "input/index.md", "# Home\n");
    write(dir.path(), "input/bad.md", "---\n1/0\n---\n# Bad\n");

    let err = site(dir.path()).render(false).unwrap_err();
    assert!(matches!(err, RenderError::Failed(1)));
    assert!(!dir.path().join("output/bad.html").exists());
}

#[test]
fn config_change_forces_page_rebuilds_but_not_static_copies() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "input/index.md", "# Home\n");
    write(dir.path(), "input/about.md", "# About\n");
    write(dir.path(), "input/logo.bin", "binary bytes");
    write(dir.path(), "config/body.html", "  <body>\nv1\n@content@\n  </body>");

    site(dir.path()).render(false).unwrap();

    // Touch the body template to a newer mtime than the output directory.
    write(dir.path(), "config/body.html", "  <body>\nv2\n@content@\n  </body>");
    set_mtime(
        &dir.path().join("config/body.html"),
        SystemTime::now() + Duration::from_secs(5),
    );

    let pass = site(dir.path()).render(false).unwrap();

    // Both pages rewrote even though their inputs were unchanged; the static
    // file was exempt.
    assert_eq!(pass.rendered, 2);

    let index = fs::read_to_string(dir.path().join("output/index.html")).unwrap();
    assert!(index.contains("v2"), "{index}");
}

#[test]
fn stale_static_file_is_copied_again() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "input/index.md", "# Home\n");
    write(dir.path(), "input/logo.bin", "old bytes");

    site(dir.path()).render(false).unwrap();

    write(dir.path(), "input/logo.bin", "new bytes");
    set_mtime(
        &dir.path().join("input/logo.bin"),
        SystemTime::now() + Duration::from_secs(5),
    );

    let pass = site(dir.path()).render(false).unwrap();
    assert_eq!(pass.rendered, 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("output/logo.bin")).unwrap(),
        "new bytes"
    );
}

#[test]
fn site_prefix_flows_into_urls() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config/site.conf", "site.prefix = '/docs'\n");
    write(
        dir.path(),
        "config/body.html",
        "  <body>\n{{path_nav()}}\n@content@\n  </body>",
    );
    write(dir.path(), "input/index.md", "# Home\n");
    write(dir.path(), "input/about.md", "# About\n");

    site(dir.path()).render(false).unwrap();

    let about = fs::read_to_string(dir.path().join("output/about.html")).unwrap();
    assert!(
        about.contains("<a href=\"/docs/index.html\">Home</a>"),
        "{about}"
    );
}

#[test]
fn header_sets_locals_and_title_used_by_templates() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "input/index.md",
        "---\npage.title = 'Front Door'\nedited = 'today'\n---\n# Ignored Heading\n\nLast edited {{edited}}.\n",
    );

    site(dir.path()).render(false).unwrap();

    let index = fs::read_to_string(dir.path().join("output/index.html")).unwrap();
    assert!(index.contains("<title>Front Door</title>"), "{index}");
    assert!(index.contains("Last edited today."), "{index}");
}

#[test]
fn config_globals_are_visible_in_pages() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "config/site.conf",
        "release = '1.4'\nsite.title = 'Docs'\n",
    );
    write(dir.path(), "input/index.md", "# Home\n\nRelease {{release}}.\n");

    site(dir.path()).render(false).unwrap();

    let index = fs::read_to_string(dir.path().join("output/index.html")).unwrap();
    assert!(index.contains("Release 1.4."), "{index}");
}

#[test]
fn config_script_error_reports_the_config_path() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config/site.conf", "site.not_a_setting = 1\n");
    write(dir.path(), "input/index.md", "# Home\n");

    let err = site(dir.path()).render(false).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("site.conf"), "{message}");
    assert!(message.contains("access not allowed"), "{message}");
}

#[test]
fn template_pages_substitute_without_markdown() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config/site.conf", "site.title = 'Docs'\n");
    write(
        dir.path(),
        "input/main.css",
        "/* {{site.title}} */\nbody { color: black; }\n",
    );

    site(dir.path()).render(false).unwrap();

    let css = fs::read_to_string(dir.path().join("output/main.css")).unwrap();
    // Substituted, but not converted or wrapped in page templates.
    assert_eq!(css, "/* Docs */\nbody { color: black; }\n");
}

#[test]
fn nested_indexes_chain_in_the_navigation_trail() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "config/body.html",
        "  <body>\n{{path_nav()}}\n@content@\n  </body>",
    );
    write(dir.path(), "input/index.md", "# Home\n");
    write(dir.path(), "input/guides/index.md", "# Guides\n");
    write(dir.path(), "input/guides/setup.md", "# Setup\n");

    site(dir.path()).render(false).unwrap();

    let setup = fs::read_to_string(dir.path().join("output/guides/setup.html")).unwrap();
    assert!(setup.contains("<a href=\"/index.html\">Home</a>"), "{setup}");
    assert!(
        setup.contains("<a href=\"/guides/index.html\">Guides</a>"),
        "{setup}"
    );
}

#[test]
fn ignored_files_are_not_rendered() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config/site.conf", "site.ignored_files = ['.git', 'drafts']\n");
    write(dir.path(), "input/index.md", "# Home\n");
    write(dir.path(), "input/drafts/wip.md", "# WIP\n");

    let pass = site(dir.path()).render(false).unwrap();
    assert_eq!(pass.rendered, 1);
    assert!(!dir.path().join("output/drafts").exists());
}
