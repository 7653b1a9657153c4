use couchbase_lite_rest::{
    Authentication, ChangeNotification, Database, DatabaseConfig, ViewQuery,
};
use log::{error, trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;
use tokio::{
    io::AsyncBufReadExt,
    sync::broadcast::{error::RecvError, Receiver},
};

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
struct Message {
    msg: String,
}

const CHAT_DESIGN: &str = "_design/chat";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let runtime = tokio::runtime::Runtime::new()?;

    let base_url = env::args()
        .nth(1)
        .unwrap_or_else(|| "http://192.168.1.132:4984/".to_string());
    let db_name = env::args().nth(2).unwrap_or_else(|| "demo".to_string());
    let auth = match env::args().nth(3) {
        Some(token) => Authentication::SessionToken(token),
        None => Authentication::None,
    };
    let db = Database::new(DatabaseConfig::new(base_url, db_name).with_authentication(auth))?;

    runtime.block_on(async move {
        prepare_db(&db).await?;
        println!("We read all messages after open:");
        print_all_messages(&db).await?;
        println!("read all messages after open done");

        let mut listener = db.listen()?;
        let changes = listener.subscribe();
        tokio::spawn(print_changes(changes));

        let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
        static EDIT_PREFIX: &str = "edit ";
        let mut buf = String::new();
        let mut edit_id = None;
        loop {
            buf.clear();
            if stdin.read_line(&mut buf).await? == 0 {
                break;
            }
            let msg = buf.trim_end();
            if msg.is_empty() {
                continue;
            }
            if msg == "quit" {
                println!("Time to quit");
                break;
            } else if let Some(id) = msg.strip_prefix(EDIT_PREFIX) {
                edit_id = Some(id.to_string());
                println!("ready to edit message {:?}", edit_id);
            } else {
                println!("Your message is '{}'", msg);
                if let Err(err) = save_msg(&db, msg, edit_id.take().as_deref()).await {
                    eprintln!("save to db failed: {}", err);
                }
            }
        }
        listener.stop().await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    println!("exiting");
    Ok(())
}

/// Print changes until listener is done, returns number of printed change events
async fn print_changes(mut changes: Receiver<ChangeNotification>) -> usize {
    let mut printed = 0;
    loop {
        match changes.recv().await {
            Ok(ChangeNotification::Changes(event)) => {
                for change in event.results() {
                    println!("changed: {}", change);
                }
                printed += 1;
            }
            Ok(ChangeNotification::Failed(err)) => {
                error!("listening for changes failed: {}", err);
                break;
            }
            Ok(ChangeNotification::Stopped) | Err(RecvError::Closed) => break,
            Err(RecvError::Lagged(n)) => warn!("printer lagged, {} notifications lost", n),
        }
    }
    trace!("changes printer done");
    printed
}

async fn prepare_db(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    match db.create_database().await {
        Ok(_) => println!("database {} created", db.name()),
        // 412: database already exists
        Err(err) if err.status() == Some(412) => trace!("database {} exists", db.name()),
        Err(err) => return Err(err.into()),
    }
    let views = json!({
        "messages": {"map": "function(doc) { if (doc.type == 'Message') { emit(doc._id, null); } }"}
    });
    match db.get_design_document(CHAT_DESIGN).await {
        Ok(_) => {}
        Err(err) if err.is_not_found() => {
            db.create_design_document(CHAT_DESIGN, &views).await?;
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

async fn save_msg(
    db: &Database,
    data: &str,
    doc_id: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let msg = Message { msg: data.into() };
    let ack = if let Some(doc_id) = doc_id {
        println!("save_msg: edit message");
        let doc = db.get_document(doc_id).await?;
        let rev = doc["_rev"]
            .as_str()
            .ok_or_else(|| format!("document {} has no _rev", doc_id))?;
        db.update_document(doc_id, rev, &msg).await?
    } else {
        db.create_document(&msg).await?
    };
    println!("save_msg: doc id {}", ack["id"]);
    Ok(())
}

async fn print_all_messages(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let query = ViewQuery::new().include_docs(true);
    let result = db.query_view(CHAT_DESIGN, "messages", &query).await?;
    let rows = result["rows"].as_array().map(Vec::as_slice).unwrap_or(&[]);
    for row in rows {
        println!("iteration id {}", row["id"]);
        let db_msg: Message = serde_json::from_value(row["doc"].clone())?;
        println!("db_msg: {:?}", db_msg);
    }
    Ok(())
}
