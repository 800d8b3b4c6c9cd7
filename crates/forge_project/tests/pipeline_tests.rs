//! Integration tests for extraction, normalization, healing and resolution.

use std::fs;
use std::path::Component;

use forge_project::{
    extract_files, sanitize_path, CapabilityTag, FileMap, ManifestAction, PackageManifest,
    PreparedProject, ProjectNormalizer, ReferenceResolver,
};
use tempfile::tempdir;

const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mP8/x8AAwMCAO1+Tn4AAAAASUVORK5CYII=";

fn fenced(blocks: &[(&str, &str, &str)]) -> String {
    blocks
        .iter()
        .map(|(lang, path, body)| format!("```{} title={}\n{}\n```\n", lang, path, body))
        .collect::<Vec<_>>()
        .join("Some prose between blocks.\n")
}

#[test]
fn test_block_count_matches_entries() {
    let raw = fenced(&[
        ("jsx", "src/App.jsx", "export default function App(){return null}  "),
        ("css", "src/index.css", "body { margin: 0; }\n\n"),
        ("json", "package.json", "{}"),
    ]);
    let files = extract_files(&raw);
    assert_eq!(files.len(), 3);
    assert_eq!(files.get_text("src/index.css"), Some("body { margin: 0; }"));
    assert_eq!(
        files.get_text("src/App.jsx"),
        Some("export default function App(){return null}")
    );
}

#[test]
fn test_sanitized_paths_stay_inside_root() {
    let root = tempdir().unwrap();
    for raw in [
        "../../etc/passwd",
        "/abs/path.js",
        "..\\..\\windows\\system32",
        "src/../../../x.js",
        "C:/Users/x.js",
        "./././a/./b.js",
        "....//....//c.js",
    ] {
        let clean = sanitize_path(raw);
        let joined = root.path().join(&clean);
        assert!(joined.starts_with(root.path()), "{raw} -> {clean}");
        assert!(
            !std::path::Path::new(&clean)
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::RootDir)),
            "{raw} -> {clean}"
        );
    }
}

#[test]
fn test_missing_widget_synthesized_after_materialize() {
    let raw = fenced(&[(
        "jsx",
        "src/App.jsx",
        "import Widget from './components/Widget'\nexport default function App(){return <Widget />}",
    )]);
    let project = PreparedProject::from_raw(&raw);
    let dir = tempdir().unwrap();
    let report = project.materialize(dir.path()).unwrap();

    assert!(report.created.contains(&"src/components/Widget.jsx".to_string()));
    let widget = fs::read_to_string(dir.path().join("src/components/Widget.jsx")).unwrap();
    assert!(widget.contains("function Widget()"));
    assert!(widget.contains("return null"));
}

#[test]
fn test_resolver_second_pass_is_noop() {
    let raw = fenced(&[
        (
            "jsx",
            "src/App.jsx",
            "import Hero from './sections/Hero'\nimport './styles/app.scss'\nimport cfg from '../config/site.json'\nimport logo from './assets/logo.png'\nexport default function App(){return <Hero />}",
        ),
        ("jsx", "src/sections/Hero.jsx", "import Button from '../ui/Button'\nexport default function Hero(){return <Button />}"),
    ]);
    let project = PreparedProject::from_raw(&raw);
    let dir = tempdir().unwrap();

    let first = project.materialize(dir.path()).unwrap();
    assert!(!first.created.is_empty());

    let second = ReferenceResolver::new().resolve(dir.path()).unwrap();
    assert!(second.created.is_empty(), "created {:?}", second.created);
}

#[test]
fn test_materialize_round_trip() {
    let supplied: FileMap = [
        ("src/App.jsx", "export default function App(){return null}\n"),
        ("public/logo.png", PNG_DATA_URI),
        ("README.md", "# Title\n"),
    ]
    .into_iter()
    .collect();
    let (files, report) = ProjectNormalizer::new().normalize(&supplied);
    assert!(report.decoded.contains(&"public/logo.png".to_string()));

    let dir = tempdir().unwrap();
    files.materialize(dir.path()).unwrap();
    let read_back = FileMap::read_from_dir(dir.path()).unwrap();

    assert_eq!(read_back.len(), files.len());
    for (path, content) in files.iter() {
        let restored = read_back.get(path).unwrap();
        assert_eq!(restored.as_bytes(), content.as_bytes(), "{path}");
    }
    assert_eq!(&read_back.get("public/logo.png").unwrap().as_bytes()[..4], b"\x89PNG");
}

#[test]
fn test_legacy_manifest_replaced_keeping_name() {
    let raw = fenced(&[(
        "json",
        "package.json",
        r#"{"name": "legacy-shop", "scripts": {"start": "react-scripts start", "build": "react-scripts build"}, "dependencies": {"react": "^17.0.2"}}"#,
    )]);
    let project = PreparedProject::from_raw(&raw);

    assert!(matches!(
        project.normalize.manifest_action,
        Some(ManifestAction::Replaced { .. })
    ));
    let manifest = PackageManifest::parse(project.files.get_text("package.json").unwrap()).unwrap();
    assert_eq!(manifest.name.as_deref(), Some("legacy-shop"));
    assert!(!manifest.is_legacy());
}

#[test]
fn test_empty_input_uses_default_project() {
    let project = PreparedProject::from_raw("I could not generate anything, sorry.");
    assert!(project.used_default);
    for path in ["package.json", "index.html", "src/main.jsx", "src/App.jsx", "vite.config.js"] {
        assert!(project.files.contains(path), "missing {path}");
    }
}

#[test]
fn test_chakra_project_healed_end_to_end() {
    let raw = fenced(&[(
        "jsx",
        "src/App.jsx",
        "import { Box } from '@chakra-ui/react'\nimport { FaStar } from 'react-icons/fa'\nexport default function App(){return <Box><FaStar /></Box>}",
    )]);
    let project = PreparedProject::from_raw(&raw);

    assert!(project.heal.capabilities.contains(&CapabilityTag::Chakra));
    assert!(project.heal.capabilities.contains(&CapabilityTag::ReactIcons));

    let manifest = PackageManifest::parse(project.files.get_text("package.json").unwrap()).unwrap();
    assert!(manifest.dependencies.contains_key("@chakra-ui/react"));
    assert!(manifest.dependencies.contains_key("react-icons"));

    let entry = project.files.get_text("src/main.jsx").unwrap();
    assert!(entry.contains("<ChakraProvider><App /></ChakraProvider>"));

    let html = project.files.get_text("index.html").unwrap();
    assert!(html.contains(r#"id="root""#));
    assert!(html.contains("/src/main.jsx"));
}
