use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use radar::{
    fetch::ExportFetcher,
    mail::{Message, MessageSource},
    store::{LocalStore, RemoteStore},
    table::{xlsx, Value, FIXED_COLUMNS},
    workflow::{RunState, Workflow, WorkflowSettings},
};
use std::collections::HashMap;
use tempfile::tempdir;

struct Inbox(Vec<Message>);

#[async_trait]
impl MessageSource for Inbox {
    async fn fetch(&self, _sender: &str, _since: NaiveDate) -> Result<Vec<Message>> {
        Ok(self.0.clone())
    }
}

struct Exports(HashMap<&'static str, &'static str>);

#[async_trait]
impl ExportFetcher for Exports {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.0
            .get(url)
            .map(|body| body.as_bytes().to_vec())
            .ok_or_else(|| anyhow!("no export at {}", url))
    }
}

fn email(link: &str) -> Message {
    Message::from_bytes(format!(
        "From: relatorios@example.com\r\n\
         Subject: Radar diario\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
         \r\n\
         --b1\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         Abra no navegador.\r\n\
         --b1\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         \r\n\
         <table><tr><td><a href=\"{}\">Baixar CSV</a></td></tr></table>\r\n\
         --b1--\r\n",
        link
    ))
}

fn settings(work_dir: &std::path::Path) -> WorkflowSettings {
    WorkflowSettings {
        sender: "relatorios@example.com".to_string(),
        work_dir: work_dir.to_path_buf(),
        days_back: 0,
    }
}

#[tokio::test]
async fn two_runs_in_one_month_accumulate() {
    let store_dir = tempdir().unwrap();
    let work_dir = tempdir().unwrap();
    let day1 = NaiveDate::from_ymd_opt(2024, 12, 14).unwrap();
    let day2 = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();

    let exports = Exports(HashMap::from([
        (
            "https://reports.example.com/1.csv",
            "Loja (ID),Loja (Nome),Cliente (Nome),Valor,Atendente\n\
             1,Centro,Ana,150.5,Carla\n\
             1,Centro,Bruno,20,Carla\n",
        ),
        (
            "https://reports.example.com/2.csv",
            "Loja (ID),Cliente (Nome),Valor,Pontos,Campanha\n\
             2,Diego,99.9,10,natal\n",
        ),
    ]));

    let first = Workflow::new(
        settings(work_dir.path()),
        Inbox(vec![email("https://reports.example.com/1.csv")]),
        LocalStore::new(store_dir.path()).unwrap(),
        exports,
    );
    let outcome = first.run_for(day1).await;
    assert_eq!(outcome.state, RunState::Done);
    assert_eq!(outcome.rows_written, 2);

    let exports = Exports(HashMap::from([(
        "https://reports.example.com/2.csv",
        "Loja (ID),Cliente (Nome),Valor,Pontos,Campanha\n\
         2,Diego,99.9,10,natal\n",
    )]));
    let second = Workflow::new(
        settings(work_dir.path()),
        Inbox(vec![
            email("https://reports.example.com/2.csv"),
            email("https://reports.example.com/expired.csv"),
        ]),
        LocalStore::new(store_dir.path()).unwrap(),
        exports,
    );
    let outcome = second.run_for(day2).await;
    assert_eq!(outcome.state, RunState::Done);
    assert_eq!(outcome.messages, 2);
    assert_eq!(outcome.exports, 1);
    assert_eq!(outcome.rows_written, 3);

    let store = LocalStore::new(store_dir.path()).unwrap();
    let remote = store.find("RADAR_2024_12.xlsx").await.unwrap().unwrap();
    let table = xlsx::read_table(&remote.id).unwrap();

    assert_eq!(table.columns(), FIXED_COLUMNS);
    assert_eq!(table.len(), 3);
    let names: Vec<String> = table
        .column("Cliente (Nome)")
        .unwrap()
        .map(|v| v.to_string())
        .collect();
    assert_eq!(names, ["Ana", "Bruno", "Diego"]);
    assert_eq!(table.get(0, "Pontos"), Some(&Value::Empty));
    assert_eq!(table.get(2, "Pontos"), Some(&Value::Number(10.0)));
    assert_eq!(table.get(2, "Loja (Nome)"), Some(&Value::Empty));
    assert!(!table.has_column("Campanha"));
}

#[tokio::test]
async fn new_month_starts_a_new_file() {
    let store_dir = tempdir().unwrap();
    let work_dir = tempdir().unwrap();
    let exports = Exports(HashMap::from([(
        "https://reports.example.com/jan.csv",
        "Valor,TAG\n5,promo\n",
    )]));

    let workflow = Workflow::new(
        settings(work_dir.path()),
        Inbox(vec![email("https://reports.example.com/jan.csv")]),
        LocalStore::new(store_dir.path()).unwrap(),
        exports,
    );
    let outcome = workflow
        .run_for(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap())
        .await;

    assert_eq!(outcome.file_name, "RADAR_2025_01.xlsx");
    assert!(store_dir.path().join("RADAR_2025_01.xlsx").is_file());
    let table = xlsx::read_table(store_dir.path().join("RADAR_2025_01.xlsx")).unwrap();
    assert_eq!(table.get(0, "TAG"), Some(&Value::from("promo")));
}
