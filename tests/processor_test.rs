use dockergen::error::Error;
use dockergen::processor::{Processor, StageAction};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

fn write<P: AsRef<Path>>(path: P, content: &str) {
    let path = path.as_ref();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read<P: AsRef<Path>>(path: P) -> String {
    fs::read_to_string(path).unwrap()
}

struct Tree {
    src: TempDir,
    out: TempDir,
}

impl Tree {
    fn new() -> Self {
        Self { src: TempDir::new().unwrap(), out: TempDir::new().unwrap() }
    }

    fn src(&self, relative: &str) -> std::path::PathBuf {
        self.src.path().join(relative)
    }

    fn out(&self, relative: &str) -> std::path::PathBuf {
        self.out.path().join("output").join(relative)
    }

    fn generate(&self, suffix: &str, extra: &[&str]) -> Result<(), Error> {
        let extra: Vec<String> = extra.iter().map(|s| s.to_string()).collect();
        Processor::new(self.src.path(), self.out.path().join("output"), suffix)?.generate(&extra)
    }
}

#[test_log::test]
fn test_generate_renders_explicit_files() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\n");
    write(tree.src("a/config.yml"), "files: [\"Dockerfile.t\"]\n");
    write(tree.src("a/Dockerfile.t"), "FROM debian\n{{ apt.update() }}\n");

    tree.generate("t", &[]).unwrap();

    assert_eq!(
        read(tree.out("a/Dockerfile")),
        "FROM debian\nRUN DEBIAN_FRONTEND=noninteractive apt-get update\n"
    );
    assert!(!tree.out("a/Dockerfile.t").exists());
    assert!(!tree.out("a/config.yml").exists());
}

#[test_log::test]
fn test_generate_copy_tmpl_stages_helper() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "name: demo\nsubdirs: [a]\n");
    write(tree.src("a/config.yml"), "files: [Dockerfile.t]\n");
    write(
        tree.src("a/Dockerfile.t"),
        "FROM debian\n{{ docker.copy_tmpl(\"helper.t\", \"/helper\") }}\n",
    );
    write(tree.src("a/helper.t"), "echo {{ name }}\n");

    tree.generate("t", &[]).unwrap();

    assert_eq!(read(tree.out("a/Dockerfile")), "FROM debian\nCOPY helper /helper\n");
    assert_eq!(read(tree.out("a/helper")), "echo demo\n");
    assert!(!tree.out("a/helper.t").exists());
}

#[test]
fn test_generate_merges_inherited_configuration() {
    let tree = Tree::new();
    write(
        tree.src("config.yml"),
        "greeting: hello\nnested: {x: 1, y: 2}\nsubdirs: [a]\n",
    );
    write(tree.src("a/config.yml"), "nested: {y: 3}\nsubdirs: [b]\n");
    write(tree.src("a/info.txt.j2"), "{{ greeting }} {{ nested.x }} {{ nested.y }}\n");
    write(tree.src("a/b/config.yml"), "greeting: hi\n");
    write(tree.src("a/b/info.txt.j2"), "{{ greeting }} {{ nested.x }} {{ nested.y }}\n");

    tree.generate("j2", &[]).unwrap();

    assert_eq!(read(tree.out("a/info.txt")), "hello 1 3\n");
    assert_eq!(read(tree.out("a/b/info.txt")), "hi 1 3\n");
}

#[test]
fn test_generate_copies_other_files_verbatim() {
    let tree = Tree::new();
    let bytes: Vec<u8> = vec![0, 159, 146, 150, b'{', b'{', 255];
    write(tree.src("config.yml"), "subdirs: [a]\n");
    fs::create_dir_all(tree.src("a")).unwrap();
    fs::write(tree.src("a/blob.bin"), &bytes).unwrap();
    write(tree.src("a/entrypoint.sh"), "#!/bin/sh\necho {{ not rendered }}\n");

    tree.generate("j2", &[]).unwrap();

    assert_eq!(fs::read(tree.out("a/blob.bin")).unwrap(), bytes);
    assert_eq!(read(tree.out("a/entrypoint.sh")), "#!/bin/sh\necho {{ not rendered }}\n");
}

#[test]
fn test_child_does_not_inherit_files_or_subdirs() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "files: [root.txt.j2]\nsubdirs: [a]\n");
    write(tree.src("root.txt.j2"), "root\n");
    write(tree.src("a/Dockerfile.j2"), "FROM scratch\n");

    tree.generate("j2", &[]).unwrap();

    assert_eq!(read(tree.out("root.txt")), "root\n");
    assert_eq!(read(tree.out("a/Dockerfile")), "FROM scratch\n");
    assert!(!tree.out("a/a").exists());
}

#[test]
fn test_files_remap_and_implicit_templates() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\n");
    write(tree.src("a/config.yml"), "files: [\"Dockerfile.j2:Dockerfile.prod\"]\n");
    write(tree.src("a/Dockerfile.j2"), "FROM scratch\n{{ import('common.j2') }}\n");
    write(tree.src("a/common.j2"), "ENV A=1\n");
    write(tree.src("a/notes.txt"), "notes\n");

    tree.generate("j2", &[]).unwrap();

    assert!(read(tree.out("a/Dockerfile.prod")).contains("ENV A=1\n##### end: "));
    assert!(!tree.out("a/Dockerfile").exists());
    assert_eq!(read(tree.out("a/common")), "ENV A=1\n");
    assert_eq!(read(tree.out("a/notes.txt")), "notes\n");
}

#[test]
fn test_unlisted_templates_render_next_to_files() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\nimage: debian\n");
    write(tree.src("a/config.yml"), "files: [\"Dockerfile.j2:Dockerfile\"]\n");
    write(tree.src("a/Dockerfile.j2"), "FROM {{ image }}\n");
    write(tree.src("a/entry.sh.j2"), "exec {{ image }}\n");

    tree.generate("j2", &[]).unwrap();

    assert_eq!(read(tree.out("a/Dockerfile")), "FROM debian\n");
    assert_eq!(read(tree.out("a/entry.sh")), "exec debian\n");
    assert!(!tree.out("a/entry.sh.j2").exists());
}

#[test]
fn test_staged_files_of_mixed_directory() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\n");
    write(
        tree.src("a/config.yml"),
        "files: [\"Dockerfile.j2:Dockerfile\", \"motd.j2:etc/motd\"]\nsubdirs: [b]\n",
    );
    write(tree.src("a/config.yml.sample"), "name: sample\n");
    write(tree.src("a/Dockerfile.j2"), "FROM scratch\n");
    write(tree.src("a/motd.j2"), "welcome\n");
    write(tree.src("a/entry.sh.j2"), "exec true\n");
    write(tree.src("a/nginx.conf.j2"), "server {}\n");
    write(tree.src("a/notes.txt"), "notes\n");
    write(tree.src("a/run.sh"), "#!/bin/sh\n");
    write(tree.src("a/b/Dockerfile.j2"), "FROM b\n");

    tree.generate("j2", &[]).unwrap();

    let staged: BTreeSet<String> = WalkDir::new(tree.out("a"))
        .min_depth(1)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            entry
                .path()
                .strip_prefix(tree.out("a"))
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    let expected: BTreeSet<String> = [
        "Dockerfile",
        "etc/motd",
        "entry.sh",
        "nginx.conf",
        "notes.txt",
        "run.sh",
        "b/Dockerfile",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(staged, expected);
}

#[test]
fn test_current_dir_file_entry_is_not_copied() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\nname: demo\n");
    write(
        tree.src("a/config.yml"),
        "files: [\"./x.sh\", \"sub/../y.sh\", \"Dockerfile.j2\"]\n",
    );
    write(tree.src("a/Dockerfile.j2"), "FROM scratch\n");
    write(tree.src("a/x.sh"), "echo {{ name }}\n");
    write(tree.src("a/y.sh"), "echo {{ name }}\n");
    fs::create_dir_all(tree.src("a/sub")).unwrap();

    tree.generate("j2", &[]).unwrap();

    assert_eq!(read(tree.out("a/x.sh")), "echo demo\n");
    assert_eq!(read(tree.out("a/y.sh")), "echo demo\n");
}

#[test]
fn test_generate_removes_stale_output() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\n");
    write(tree.src("a/Dockerfile.j2"), "FROM scratch\n");
    write(tree.out("a/stale.txt"), "old\n");

    tree.generate("j2", &[]).unwrap();

    assert!(!tree.out("a/stale.txt").exists());
    assert!(tree.out("a/Dockerfile").is_file());
}

#[test]
fn test_generate_is_idempotent() {
    let tree = Tree::new();
    let other = TempDir::new().unwrap();
    write(tree.src("config.yml"), "subdirs: [a, b]\nports: [80]\n");
    write(tree.src("a/Dockerfile.j2"), "FROM scratch\n{{ docker.ports() }}\n{{ import('x.inc') }}\n");
    write(tree.src("a/x.inc"), "RUN true\n");
    write(tree.src("b/config.yml"), "files: [Dockerfile.j2]\n");
    write(tree.src("b/Dockerfile.j2"), "{{ docker.copy_tmpl('run.sh.j2', '/run.sh') }}\n");
    write(tree.src("b/run.sh.j2"), "exec true\n");

    tree.generate("j2", &[]).unwrap();
    tree.generate("j2", &[]).unwrap();
    Processor::new(tree.src.path(), other.path(), "j2")
        .unwrap()
        .generate(&[])
        .unwrap();

    assert!(!dir_diff::is_different(tree.out.path().join("output"), other.path()).unwrap());
}

#[test]
fn test_extra_subdirs_are_appended() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\n");
    write(tree.src("a/Dockerfile.j2"), "FROM a\n");
    write(tree.src("b/Dockerfile.j2"), "FROM b\n");

    tree.generate("j2", &["b"]).unwrap();

    assert_eq!(read(tree.out("a/Dockerfile")), "FROM a\n");
    assert_eq!(read(tree.out("b/Dockerfile")), "FROM b\n");
}

#[test]
fn test_sample_config_is_used() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\n");
    write(tree.src("a/config.yml.sample"), "value: 42\n");
    write(tree.src("a/value.txt.j2"), "{{ value }}");

    tree.generate("j2", &[]).unwrap();

    assert_eq!(read(tree.out("a/value.txt")), "42");
    assert!(tree.src("a/config.yml").is_file());
    assert!(!tree.out("a/config.yml.sample").exists());
}

#[test]
fn test_empty_subdir_list() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "name: x\n");

    assert!(matches!(tree.generate("j2", &[]), Err(Error::EmptySubdirList { .. })));
}

#[test]
fn test_missing_top_level_subdir() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a, missing]\n");
    write(tree.src("a/Dockerfile.j2"), "FROM a\n");

    match tree.generate("j2", &[]) {
        Err(Error::MissingSubdirectory { path }) => assert_eq!(path, tree.src("missing")),
        other => panic!("Expected MissingSubdirectory, got {:?}", other),
    }
    assert!(!tree.out("a").exists());
}

#[test]
fn test_missing_nested_subdir() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\n");
    write(tree.src("a/config.yml"), "subdirs: [gone]\n");

    assert!(matches!(
        tree.generate("j2", &[]),
        Err(Error::MissingSubdirectory { .. })
    ));
}

#[test]
fn test_empty_directory_is_fatal() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\n");
    write(tree.src("a/config.yml"), "name: empty\n");

    match tree.generate("j2", &[]) {
        Err(Error::EmptyDirectory { path }) => assert_eq!(path, tree.src("a")),
        other => panic!("Expected EmptyDirectory, got {:?}", other),
    }
}

#[test]
fn test_listed_file_must_exist() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\n");
    write(tree.src("a/config.yml"), "files: [nope.j2]\n");

    assert!(matches!(tree.generate("j2", &[]), Err(Error::ConfigError(_))));
}

#[test]
fn test_import_cycle_aborts_generation() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\n");
    write(tree.src("a/Dockerfile.j2"), "{{ import('loop.inc') }}\n");
    write(tree.src("a/loop.inc"), "{{ import('loop.inc') }}\n");

    assert!(matches!(tree.generate("j2", &[]), Err(Error::ImportCycle { .. })));
}

#[test]
fn test_output_must_not_contain_source() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\n");
    write(tree.src("a/Dockerfile.j2"), "FROM a\n");

    let processor = Processor::new(tree.src.path(), tree.src.path(), "j2").unwrap();
    assert!(matches!(
        processor.generate(&[]),
        Err(Error::OutputOverlapsSource { .. })
    ));
    let processor = Processor::new(tree.src("a"), tree.src.path(), "j2").unwrap();
    assert!(matches!(
        processor.generate(&[]),
        Err(Error::OutputOverlapsSource { .. })
    ));
    assert!(tree.src("a/Dockerfile.j2").is_file());
}

#[test]
fn test_output_must_not_lie_inside_a_unit() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\n");
    write(tree.src("a/config.yml"), "subdirs: [b]\n");
    write(tree.src("a/Dockerfile.j2"), "FROM a\n");
    write(tree.src("a/b/Dockerfile.j2"), "FROM b\n");

    for output in [tree.src("a"), tree.src("a/generated"), tree.src("a/b/out")] {
        let processor = Processor::new(tree.src.path(), &output, "j2").unwrap();
        match processor.generate(&[]) {
            Err(Error::OutputOverlapsSource { .. }) => {}
            other => panic!("Expected OutputOverlapsSource for {:?}, got {:?}", output, other),
        }
    }
    assert_eq!(read(tree.src("a/Dockerfile.j2")), "FROM a\n");
    assert_eq!(read(tree.src("a/b/Dockerfile.j2")), "FROM b\n");
    assert!(!tree.src("a/generated").exists());
}

#[test]
fn test_default_output_inside_source() {
    let tree = Tree::new();
    write(tree.src("config.yml"), "subdirs: [a]\n");
    write(tree.src("a/Dockerfile.j2"), "FROM a\n");
    let processor = Processor::new(tree.src.path(), tree.src("output"), "j2").unwrap();

    processor.generate(&[]).unwrap();
    processor.generate(&[]).unwrap();

    assert_eq!(read(tree.src("output/a/Dockerfile")), "FROM a\n");
    assert!(!tree.src("output/output").exists());
}

#[test]
fn test_plan_classifies_entries() {
    let tree = Tree::new();
    write(tree.src("Dockerfile.j2"), "");
    write(tree.src("config.yml"), "");
    write(tree.src("run.sh"), "");
    fs::create_dir_all(tree.src("nested")).unwrap();
    let processor = Processor::new(tree.src.path(), tree.out.path(), "j2").unwrap();

    let units = processor
        .plan(tree.src.path(), tree.out.path(), &Default::default())
        .unwrap();

    assert_eq!(units.len(), 2);
    assert_eq!(units[0].source, tree.src("Dockerfile.j2"));
    assert_eq!(units[0].target, tree.out.path().join("Dockerfile"));
    assert_eq!(units[0].action, StageAction::Render);
    assert_eq!(units[1].source, tree.src("run.sh"));
    assert_eq!(units[1].action, StageAction::Copy);
}
