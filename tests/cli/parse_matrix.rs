use blockfs::alloc::AllocationMethod;
use blockfs::tooling::cli::{Cli, Commands};
use clap::{CommandFactory, Parser};

#[test]
fn parse_valid_command_matrix() {
    let cases: Vec<Vec<&str>> = vec![
        vec!["blockfs", "init"],
        vec!["blockfs", "init", "--disk-size", "64", "--block-size", "32", "--force"],
        vec!["blockfs", "mkdir", "/docs"],
        vec!["blockfs", "create", "/docs/a.txt", "--content", "hi"],
        vec!["blockfs", "create", "b.bin", "--from-file", "./b.bin", "--method", "linked"],
        vec!["blockfs", "write", "/docs/a.txt", "--content", "more", "--method", "Indexed"],
        vec!["blockfs", "rename", "/docs/a.txt", "b.txt"],
        vec!["blockfs", "rm", "/docs", "--yes"],
        vec!["blockfs", "ls"],
        vec!["blockfs", "ls", "/docs", "--format", "json"],
        vec!["blockfs", "cat", "/docs/a.txt"],
        vec!["blockfs", "stat", "/docs/a.txt"],
        vec!["blockfs", "import", "/docs", "one.txt", "two.txt"],
        vec!["blockfs", "usage", "--workspace", "/tmp"],
        vec!["blockfs", "validate", "--repair"],
        vec!["blockfs", "config", "--state", "/tmp/state.json"],
    ];

    for args in cases {
        let parsed = Cli::try_parse_from(args.clone());
        assert!(parsed.is_ok(), "expected valid parse for args: {args:?}");
    }
}

#[test]
fn parse_rejects_invalid_input() {
    let cases: Vec<Vec<&str>> = vec![
        vec!["blockfs", "create", "a.txt", "--content", "x", "--from-file", "y"],
        vec!["blockfs", "create", "a.txt", "--method", "striped"],
        vec!["blockfs", "import", "/docs"],
        vec!["blockfs", "init", "--disk-size", "-3"],
        vec!["blockfs", "rename", "/a"],
    ];

    for args in cases {
        assert!(
            Cli::try_parse_from(args.clone()).is_err(),
            "expected parse failure for args: {args:?}"
        );
    }
}

#[test]
fn method_flag_parses_into_allocation_method() {
    let cli = Cli::try_parse_from(["blockfs", "create", "a", "--method", "indexed"]).unwrap();
    match cli.command {
        Commands::Create { content, .. } => {
            assert_eq!(content.method, Some(AllocationMethod::Indexed));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}
