use std::fs;
use std::path::{Path, PathBuf};

use coinpurse_client::commands::import::{self, ImportListOptions, ImportRunOptions};
use coinpurse_client::commands::records::{self, RecordsListOptions};
use coinpurse_client::contracts::envelope::failure_from_error;
use coinpurse_client::{ClientResult, SuccessEnvelope};
use serde_json::Value;
use tempfile::tempdir;

const EXPENSES_CSV: &str = "Date,Amount,Title,Category\n\
2024-03-15,\"$1,200.50\",Rent,Housing\n\
03/16/2024,12.5,Lunch,Food\n\
,9,Missing date,Food\n";

fn write_file(path: &Path, body: &str) {
    let result = fs::write(path, body);
    assert!(result.is_ok());
}

fn temp_home() -> std::io::Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempdir()?;
    let home = dir.path().join("ledger-home");
    Ok((dir, home))
}

fn options<'a>(home: &'a Path, path: &Path, entity: &str) -> ImportRunOptions<'a> {
    ImportRunOptions {
        path: path.display().to_string(),
        entity: entity.to_string(),
        home_override: Some(home),
        ..ImportRunOptions::default()
    }
}

fn data(result: ClientResult<SuccessEnvelope>) -> Value {
    assert!(result.is_ok());
    match result {
        Ok(success) => success.data,
        Err(_) => Value::Null,
    }
}

fn error_code(result: ClientResult<SuccessEnvelope>) -> String {
    assert!(result.is_err());
    match result {
        Ok(_) => String::new(),
        Err(error) => failure_from_error(&error).error.code,
    }
}

fn stored_records(home: &Path, entity: &str) -> Value {
    data(records::list_with_options(
        entity,
        RecordsListOptions {
            home_override: Some(home),
        },
    ))
}

#[tokio::test]
async fn dry_run_reports_analysis_without_writing() {
    let temp = temp_home();
    assert!(temp.is_ok());
    if let Ok((dir, home)) = temp {
        let csv_path = dir.path().join("march.csv");
        write_file(&csv_path, EXPENSES_CSV);

        let mut run = options(&home, &csv_path, "expenses");
        run.dry_run = true;
        let payload = data(import::run_with_options(run).await);

        assert_eq!(payload["dry_run"], true);
        assert!(payload.get("import_id").is_none());
        assert_eq!(payload["summary"]["rows_read"], 3);
        assert_eq!(payload["summary"]["rows_valid"], 2);
        assert_eq!(payload["summary"]["rows_invalid"], 1);
        assert_eq!(payload["invalid_rows"][0]["row"], 3);
        assert_eq!(payload["mapping"][0]["header"], "Date");
        assert_eq!(payload["mapping"][0]["column"], 1);
        assert_eq!(payload["preview"][0]["amount"], 1200.5);
        assert_eq!(payload["preview"][1]["date"], "2024-03-16");

        assert_eq!(stored_records(&home, "expenses")["total"], 0);
    }
}

#[tokio::test]
async fn import_writes_records_and_a_run_row() {
    let temp = temp_home();
    assert!(temp.is_ok());
    if let Ok((dir, home)) = temp {
        let csv_path = dir.path().join("march.csv");
        write_file(&csv_path, EXPENSES_CSV);

        let payload = data(import::run_with_options(options(&home, &csv_path, "expenses")).await);
        assert_eq!(payload["outcome"]["imported"], 2);
        assert_eq!(payload["outcome"]["failed"], 0);
        let import_id = payload["import_id"].as_str().map(str::to_string);
        assert!(import_id.is_some());

        let records_payload = stored_records(&home, "expenses");
        assert_eq!(records_payload["total"], 2);
        assert_eq!(records_payload["rows"][0]["values"]["title"], "Rent");
        assert_eq!(records_payload["rows"][0]["values"]["category"], "Housing");
        assert!(records_payload["rows"][0]["values"]["notes"].is_null());
        assert_eq!(
            records_payload["rows"][0]["import_id"].as_str().map(str::to_string),
            import_id
        );

        let runs = data(import::list_with_options(ImportListOptions {
            home_override: Some(&home),
        }));
        assert_eq!(runs["rows"][0]["status"], "completed");
        assert_eq!(runs["rows"][0]["entity"], "expenses");
        assert_eq!(runs["rows"][0]["file_name"], "march.csv");
        assert_eq!(runs["rows"][0]["rows_invalid"], 1);
        assert_eq!(runs["rows"][0]["imported"], 2);
        assert_eq!(runs["rows"][0]["duplicate_policy"], "skip");
    }
}

#[tokio::test]
async fn reimport_skips_duplicates_unless_included() {
    let temp = temp_home();
    assert!(temp.is_ok());
    if let Ok((dir, home)) = temp {
        let csv_path = dir.path().join("march.csv");
        write_file(&csv_path, EXPENSES_CSV);
        let first = import::run_with_options(options(&home, &csv_path, "expenses")).await;
        assert!(first.is_ok());

        let again = import::run_with_options(options(&home, &csv_path, "expenses")).await;
        assert_eq!(error_code(again), "nothing_to_import");

        let mut include = options(&home, &csv_path, "expenses");
        include.duplicates = Some("include".to_string());
        let payload = data(import::run_with_options(include).await);
        assert_eq!(payload["summary"]["rows_duplicate"], 2);
        assert_eq!(payload["outcome"]["dup_included"], 2);
        assert_eq!(payload["outcome"]["imported"], 2);

        assert_eq!(stored_records(&home, "expenses")["total"], 4);

        let runs = data(import::list_with_options(ImportListOptions {
            home_override: Some(&home),
        }));
        assert_eq!(runs["rows"].as_array().map(Vec::len), Some(2));
    }
}

#[tokio::test]
async fn explicit_mapping_and_date_format_override_the_guess() {
    let temp = temp_home();
    assert!(temp.is_ok());
    if let Ok((dir, home)) = temp {
        let csv_path = dir.path().join("payslips.csv");
        write_file(
            &csv_path,
            "When,Value,Payer\n04/05/2024,\"2.500,00\",Acme Ltd\n",
        );

        let mut run = options(&home, &csv_path, "income");
        run.mappings = vec![
            "date=when".to_string(),
            "amount=2".to_string(),
            "source=Payer".to_string(),
        ];
        run.date_format = Some("dd/mm/yyyy".to_string());
        let payload = data(import::run_with_options(run).await);

        assert_eq!(payload["date_format"], "DD/MM/YYYY");
        assert_eq!(payload["outcome"]["imported"], 1);
        let stored = stored_records(&home, "income");
        assert_eq!(stored["rows"][0]["values"]["date"], "2024-05-04");
        assert_eq!(stored["rows"][0]["values"]["amount"], 2500.0);
        assert_eq!(stored["rows"][0]["values"]["source"], "Acme Ltd");
    }
}

#[tokio::test]
async fn stdin_source_is_named_stdin_csv() {
    let temp = temp_home();
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let payload = data(
            import::run_with_options(ImportRunOptions {
                path: "-".to_string(),
                entity: "notes".to_string(),
                home_override: Some(&home),
                stdin_override: Some("Title,Content\nGroceries,Milk and eggs\n".to_string()),
                ..ImportRunOptions::default()
            })
            .await,
        );
        assert_eq!(payload["file_name"], "stdin.csv");
        assert_eq!(payload["outcome"]["imported"], 1);
    }
}

#[tokio::test]
async fn user_errors_carry_specific_codes() {
    let temp = temp_home();
    assert!(temp.is_ok());
    if let Ok((dir, home)) = temp {
        let csv_path = dir.path().join("march.csv");
        write_file(&csv_path, EXPENSES_CSV);
        let unknown_entity = import::run_with_options(options(&home, &csv_path, "pets")).await;
        assert_eq!(error_code(unknown_entity), "unknown_entity");

        let text_path = dir.path().join("march.txt");
        write_file(&text_path, EXPENSES_CSV);
        let wrong_extension = import::run_with_options(options(&home, &text_path, "expenses")).await;
        assert_eq!(error_code(wrong_extension), "csv_unsupported_extension");

        let header_only = dir.path().join("header.csv");
        write_file(&header_only, "Date,Amount,Title\n");
        let too_few = import::run_with_options(options(&home, &header_only, "expenses")).await;
        assert_eq!(error_code(too_few), "csv_too_few_rows");

        let unmatched = dir.path().join("unmatched.csv");
        write_file(&unmatched, "Foo,Bar\n1,2\n");
        let unmapped = import::run_with_options(options(&home, &unmatched, "expenses")).await;
        assert_eq!(error_code(unmapped), "no_required_field_mapped");

        let mut bad_column = options(&home, &csv_path, "expenses");
        bad_column.mappings = vec!["title=Memo".to_string()];
        let unknown_column = import::run_with_options(bad_column).await;
        assert_eq!(error_code(unknown_column), "unknown_column");

        let mut bad_field = options(&home, &csv_path, "expenses");
        bad_field.mappings = vec!["tip=1".to_string()];
        let unknown_field = import::run_with_options(bad_field).await;
        assert_eq!(error_code(unknown_field), "invalid_mapping");
    }
}
