//! Focused unit tests covering the summary command.

use super::helpers::Workspace;
use super::*;
use crate::summary::{SummaryArgs, SummaryConfig, execute_summary};
use rstest::rstest;

#[rstest]
fn converting_summary_without_files_errors() {
    let err = SummaryConfig::try_from(SummaryArgs::default()).expect_err("files are required");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_FILES);
            assert_eq!(env, ENV_SUMMARY_FILES);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn summary_lists_each_feature_set() {
    let workspace = Workspace::new();
    let channel = workspace.channel();
    let piers = workspace.collection(
        "piers.geojson",
        "Piers",
        &[("Brighton", r#"{"type":"Point","coordinates":[-0.14,50.82]}"#)],
    );
    let config = SummaryConfig {
        files: vec![piers.clone(), channel.clone()],
    };

    let mut buffer = Vec::new();
    execute_summary(&config, &mut buffer).expect("summary should succeed");
    let text = String::from_utf8(buffer).expect("utf-8 output");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            format!("{channel}\tChannel\tgeojson\t4"),
            format!("{piers}\tPiers\tgeojson\t1"),
        ]
    );
}

#[rstest]
fn summary_subcommand_parses() {
    let cli = Cli::try_parse_from(["geofeature", "summary", "a.geojson"])
        .expect("arguments should parse");
    match cli.command {
        Command::Summary(args) => assert_eq!(args.files.len(), 1),
        Command::Query(_) => panic!("expected the summary command"),
    }
}
