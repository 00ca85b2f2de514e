//! Integration tests for compilation sessions.

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use common::{FakeCompiler, PRELUDE, Workspace, session, session_with};
use tern_core::{BuildOptions, Error, ErrorKind};

#[test]
fn test_build_dir_links_command() {
    let ws = Workspace::new();
    ws.write(
        "src/example.com/greet/greet.src",
        "package greet\n\nfunc Hello()\nfunc Unused()\n",
    );
    ws.write(
        "src/example.com/hello/main.src",
        "package main\n\nimport \"example.com/greet\"\n\nfunc main() calls example.com/greet:Hello\n",
    );
    let dir = ws.dir("src/example.com/hello");
    let compiler = FakeCompiler::new();
    let mut session = session_with(&ws, &dir, &compiler, BuildOptions::default().with_map_file());

    session.build_dir(&dir, &dir, None).unwrap();

    assert_eq!(compiler.compiled(), vec!["example.com/greet", "example.com/hello"]);

    let artifact = fs::read_to_string(dir.join("hello.js")).unwrap();
    assert!(artifact.starts_with(PRELUDE));
    assert!(artifact.contains("$pkg.Hello = function() {};"));
    assert!(!artifact.contains("Unused"));
    assert!(artifact.ends_with("$packages[\"example.com/hello\"].main();\n"));

    let greet = artifact.find("$packages[\"example.com/greet\"]").unwrap();
    let hello = artifact.find("$packages[\"example.com/hello\"] =").unwrap();
    assert!(greet < hello);

    let map: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("hello.js.map")).unwrap()).unwrap();
    assert_eq!(map["packages"].as_array().unwrap().len(), 2);
}

#[test]
fn test_build_dir_records_dependency_closure() {
    let ws = Workspace::new();
    ws.write("src/a/a.src", "package a\n\nimport \"b\"\n");
    ws.write("src/b/b.src", "package b\n\nimport \"c\"\n");
    ws.write("src/c/c.src", "package c\n");
    let dir = ws.dir("src/a");
    let compiler = FakeCompiler::new();
    let mut session = session(&ws, &dir, &compiler);

    session.build_dir(&dir, &dir, None).unwrap();

    let record = session.package("a").unwrap();
    let archive = record.archive.as_ref().unwrap();
    assert_eq!(archive.dependencies, vec!["c", "b"]);
    assert_eq!(archive.imports, vec!["b"]);
    // Library builds are a compile check only.
    assert!(!dir.join("a.js").exists());
}

#[test]
fn test_imports_are_compiled_once() {
    let ws = Workspace::new();
    ws.write("src/app/main.src", "package main\n\nimport (\n\t\"x\"\n\t\"y\"\n)\n");
    ws.write("src/x/x.src", "package x\n\nimport \"shared\"\n");
    ws.write("src/y/y.src", "package y\n\nimport \"shared\"\n");
    ws.write("src/shared/shared.src", "package shared\n");
    let dir = ws.dir("src/app");
    let compiler = FakeCompiler::new();
    let mut session = session(&ws, &dir, &compiler);

    session.build_dir(&dir, &dir, Some(&dir.join("out.js"))).unwrap();

    assert_eq!(compiler.compiled(), vec!["shared", "x", "y", "app"]);
    assert!(dir.join("out.js").exists());
    assert!(!dir.join("out.js.map").exists());
}

#[test]
fn test_import_cycle_is_resolution_error() {
    let ws = Workspace::new();
    ws.write("src/a/a.src", "package a\n\nimport \"b\"\n");
    ws.write("src/b/b.src", "package b\n\nimport \"a\"\n");
    let dir = ws.dir("src/a");
    let compiler = FakeCompiler::new();
    let mut session = session(&ws, &dir, &compiler);

    let err = session.import_package("a").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert!(err.to_string().contains("import cycle not allowed: a -> b -> a"));
}

#[test]
fn test_missing_package() {
    let ws = Workspace::new();
    let compiler = FakeCompiler::new();
    let mut session = session(&ws, &ws.root(), &compiler);

    let err = session.import_package("example.com/nope").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert!(err.to_string().contains("cannot find package"));
}

#[test]
fn test_build_files_rejects_wrong_suffix_before_compiling() {
    let ws = Workspace::new();
    let good = ws.write("work/main.src", "package main\n\nfunc main()\n");
    let bad = ws.write("work/notes.txt", "hello");
    let dir = ws.dir("work");
    let compiler = FakeCompiler::new();
    let mut session = session(&ws, &dir, &compiler);

    let err = session
        .build_files(&[good, bad], &dir.join("main.js"), &dir)
        .unwrap_err();

    assert!(matches!(err, Error::Usage(_)));
    assert_eq!(err.to_string(), "named files must be .src files");
    assert!(compiler.compiled().is_empty());
    assert!(!dir.join("main.js").exists());
}

#[test]
fn test_build_files_writes_main() {
    let ws = Workspace::new();
    ws.write("work/main.src", "package main\n\nfunc main()\n");
    let dir = ws.dir("work");
    let compiler = FakeCompiler::new();
    let mut session = session(&ws, &dir, &compiler);

    let output = dir.join("bin/prog.js");
    session
        .build_files(&[PathBuf::from("main.src")], &output, &dir)
        .unwrap();

    let artifact = fs::read_to_string(&output).unwrap();
    assert!(artifact.contains("$packages[\"main\"] = (function() {"));
    assert!(artifact.ends_with("$packages[\"main\"].main();\n"));
}

#[test]
fn test_compile_errors_propagate() {
    let ws = Workspace::new();
    let file = ws.write("work/main.src", "package main\n\nerror\n");
    let dir = ws.dir("work");
    let compiler = FakeCompiler::new();
    let mut session = session(&ws, &dir, &compiler);

    let err = session
        .build_files(&[file.clone()], &dir.join("main.js"), &dir)
        .unwrap_err();

    match err {
        Error::Compile(diagnostics) => {
            let pos = diagnostics[0].position.as_ref().unwrap();
            assert_eq!(pos.file, file);
            assert_eq!(pos.line, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_watch_set_collects_dirs_and_files() {
    let ws = Workspace::new();
    let file = ws.write("work/main.src", "package main\n\nimport \"lib\"\n");
    ws.write("src/lib/lib.src", "package lib\n");
    let dir = ws.dir("work");
    let compiler = FakeCompiler::new();

    let options = BuildOptions {
        watch: true,
        ..BuildOptions::default()
    };
    let mut watching = session_with(&ws, &dir, &compiler, options);
    watching
        .build_files(&[file.clone()], &dir.join("main.js"), &dir)
        .unwrap();

    let watched: Vec<PathBuf> = watching.watched().iter().map(Path::to_path_buf).collect();
    assert!(watched.contains(&file));
    assert!(watched.contains(&ws.dir("src/lib")));

    // Without watch mode nothing is recorded.
    let mut quiet = session(&ws, &dir, &compiler);
    quiet
        .build_files(&[file], &dir.join("main.js"), &dir)
        .unwrap();
    assert!(quiet.watched().is_empty());
}

#[test]
fn test_write_archive() {
    let ws = Workspace::new();
    ws.write("src/lib/lib.src", "package lib\n\nfunc Exported()\n");
    let compiler = FakeCompiler::new();
    let mut session = session(&ws, &ws.root(), &compiler);

    session.import_package("lib").unwrap();
    let record = session.package("lib").unwrap().clone();
    let output = record.metadata.artifact_path.clone().unwrap();
    assert_eq!(output, ws.root().join("pkg/lib.a"));

    session.write_archive(&record, &output).unwrap();
    let stored: tern_core::Archive =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(stored.import_path, "lib");
    assert_eq!(stored.declarations.len(), 1);
}
