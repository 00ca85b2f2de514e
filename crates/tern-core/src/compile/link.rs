//! Link-time dead-code elimination and artifact assembly.

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use rustc_hash::FxHashSet;
use serde::Serialize;

use super::archive::{Archive, Decl, DepId};

/// Byte range of one package inside a linked artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapEntry {
    pub import_path: String,
    pub start: usize,
    pub end: usize,
}

/// Artifact map written next to a command artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactMap {
    pub packages: Vec<MapEntry>,
}

/// A fully linked program.
#[derive(Debug, Clone)]
pub struct LinkedArtifact {
    pub code: String,
    pub map: ArtifactMap,
}

/// Compute the set of DCE ids reachable from the always-linked declarations.
pub fn live_ids<'a>(archives: &[&'a Archive]) -> FxHashSet<&'a str> {
    let mut graph: DiGraphMap<&'a str, ()> = DiGraphMap::new();
    let mut roots: Vec<&'a str> = Vec::new();

    for decl in archives.iter().flat_map(|archive| archive.declarations.iter()) {
        match &decl.id {
            Some(id) => {
                graph.add_node(id.as_str());
                for dep in &decl.deps {
                    graph.add_edge(id.as_str(), dep.as_str(), ());
                }
            }
            None => roots.extend(decl.deps.iter().map(DepId::as_str)),
        }
    }

    let mut live = FxHashSet::default();
    let mut dfs = Dfs::empty(&graph);
    for root in roots {
        if !graph.contains_node(root) {
            tracing::debug!("dependency {} has no declaration", root);
            live.insert(root);
            continue;
        }
        dfs.move_to(root);
        while let Some(node) = dfs.next(&graph) {
            live.insert(node);
        }
    }
    live
}

fn is_live(decl: &Decl, live: &FxHashSet<&str>) -> bool {
    decl.id.as_ref().is_none_or(|id| live.contains(id.as_str()))
}

/// Link `archives` (closure order, main package last) into one program.
pub fn link(prelude: &str, archives: &[&Archive], main_import_path: &str) -> LinkedArtifact {
    let live = live_ids(archives);
    let mut code = String::with_capacity(prelude.len() + 4096);
    let mut map = ArtifactMap::default();

    code.push_str(prelude);
    if !prelude.ends_with('\n') && !prelude.is_empty() {
        code.push('\n');
    }

    for archive in archives {
        let nl = if archive.minified { "" } else { "\n" };
        let start = code.len();
        let total = archive.declarations.len();
        let mut kept = 0;

        code.push_str(&format!(
            "$packages[{}] = (function() {{{nl}var $pkg = {{}};{nl}",
            quote(&archive.import_path)
        ));
        for decl in archive.declarations.iter().filter(|d| is_live(d, &live)) {
            code.push_str(decl.body.trim_matches('\n'));
            code.push_str(nl);
            kept += 1;
        }
        code.push_str(&format!("return $pkg;{nl}}})();\n"));

        tracing::debug!(
            "linked {} ({} of {} declarations)",
            archive.import_path,
            kept,
            total
        );
        map.packages.push(MapEntry {
            import_path: archive.import_path.clone(),
            start,
            end: code.len(),
        });
    }

    code.push_str(&format!("$packages[{}].main();\n", quote(main_import_path)));
    LinkedArtifact { code, map }
}

/// Quote a string as a target-language string literal.
pub(crate) fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
