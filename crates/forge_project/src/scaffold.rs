//! Canonical scaffold files for the single supported project layout
//! (React rendered through a Vite build).

use crate::files::FileMap;
use crate::manifest::PackageManifest;

/// Canonical entry script path referenced by the entry document.
pub const ENTRY_SCRIPT: &str = "src/main.jsx";
/// Root application component.
pub const APP_COMPONENT: &str = "src/App.jsx";
/// Top-level entry document.
pub const ENTRY_DOCUMENT: &str = "index.html";
/// Package manifest.
pub const MANIFEST: &str = "package.json";
/// Build tool configuration.
pub const BUILD_CONFIG: &str = "vite.config.js";
/// Base stylesheet imported by the entry script.
pub const BASE_STYLESHEET: &str = "src/index.css";
/// Stylesheet imported by the default application component.
pub const APP_STYLESHEET: &str = "src/App.css";
/// Identifier of the DOM mount element.
pub const MOUNT_ID: &str = "root";

pub const ENTRY_DOCUMENT_HTML: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <link rel="icon" type="image/svg+xml" href="/vite.svg" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Vite + React</title>
  </head>
  <body>
    <div id="root"></div>
    <script type="module" src="/src/main.jsx"></script>
  </body>
</html>
"#;

pub const BUILD_CONFIG_JS: &str = r#"import { defineConfig } from 'vite'
import react from '@vitejs/plugin-react'

export default defineConfig({
  plugins: [react()],
  build: {
    outDir: 'dist',
    assetsDir: 'assets',
    rollupOptions: {
      onwarn(warning, warn) {
        if (warning.code === 'UNRESOLVED_IMPORT') return;
        warn(warning);
      },
    },
  },
})
"#;

pub const ESLINT_CONFIG: &str = r#"module.exports = {
  root: true,
  env: { browser: true, es2020: true },
  extends: [
    'eslint:recommended',
    'plugin:react-hooks/recommended',
  ],
  ignorePatterns: ['dist', '.eslintrc.cjs'],
  parserOptions: { ecmaVersion: 'latest', sourceType: 'module' },
  settings: { react: { version: '18.2' } },
  plugins: ['react-refresh'],
  rules: {
    'react-refresh/only-export-components': [
      'warn',
      { allowConstantExport: true },
    ],
  },
}
"#;

pub const APP_COMPONENT_JSX: &str = r#"import { useState } from 'react'
import reactLogo from '/react.svg'
import viteLogo from '/vite.svg'
import './App.css'

function App() {
  const [count, setCount] = useState(0)

  return (
    <>
      <div>
        <img src={viteLogo} className="logo" alt="Vite logo" />
        <img src={reactLogo} className="logo react" alt="React logo" />
      </div>
      <h1>Vite + React</h1>
      <div className="card">
        <button onClick={() => setCount((count) => count + 1)}>
          count is {count}
        </button>
      </div>
    </>
  )
}

export default App
"#;

pub const BASE_STYLESHEET_CSS: &str = r#"#root {
  max-width: 1280px;
  margin: 0 auto;
  padding: 2rem;
  text-align: center;
}

.logo {
  height: 6em;
  padding: 1.5em;
}

.card {
  padding: 2em;
}
"#;

pub const VITE_LOGO_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><polygon points="13,2 3,14 12,14 11,22 21,10 12,10 13,2"/></svg>
"#;

pub const REACT_LOGO_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><circle cx="12" cy="12" r="10"/><path d="M12 2a10 10 0 0 1 10 10"/><path d="M12 2a10 10 0 0 0-10 10"/></svg>
"#;

const README_MD: &str = r#"# Generated React Application

## Getting Started

```bash
npm install
npm run dev
```

- `npm run build` builds the app for production
- `npm run preview` serves the production build
"#;

/// Render the entry script, mounting `App` into the well-known root element.
pub fn entry_script() -> String {
    format!(
        "import React from 'react'\nimport ReactDOM from 'react-dom/client'\nimport App from './App.jsx'\nimport './index.css'\n\nReactDOM.createRoot(document.getElementById('{MOUNT_ID}')).render(\n  <React.StrictMode>\n    <App />\n  </React.StrictMode>,\n)\n"
    )
}

/// The canonical project substituted when extraction finds no files.
pub fn default_project() -> FileMap {
    let mut files = FileMap::new();
    let manifest = PackageManifest::canonical("generated-react-app", "1.0.0", None);
    files.insert(MANIFEST, manifest.to_json_pretty());
    files.insert(ENTRY_DOCUMENT, ENTRY_DOCUMENT_HTML);
    files.insert(APP_COMPONENT, APP_COMPONENT_JSX);
    files.insert(ENTRY_SCRIPT, entry_script());
    files.insert(BUILD_CONFIG, BUILD_CONFIG_JS);
    files.insert("README.md", README_MD);
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_script_plain() {
        let script = entry_script();
        assert!(script.contains("import App from './App.jsx'"));
        assert!(script.contains("getElementById('root')"));
        assert!(script.contains("<React.StrictMode>\n    <App />\n  </React.StrictMode>"));
    }

    #[test]
    fn test_default_project_is_buildable_shape() {
        let files = default_project();
        for path in [MANIFEST, ENTRY_DOCUMENT, APP_COMPONENT, ENTRY_SCRIPT, BUILD_CONFIG] {
            assert!(files.contains(path), "missing {path}");
        }
        let manifest = PackageManifest::parse(files.get_text(MANIFEST).unwrap()).unwrap();
        assert!(!manifest.is_legacy());
    }
}
