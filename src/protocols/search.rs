//! Search-on-target protocol.
//!
//! The destination opens with a search box; credit lands once a query is
//! submitted. Canned queries are preferred, keyed by the activity title;
//! a table miss falls back to searching the literal title.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};

use super::protocol_click;
use crate::click::ClickExecutor;
use crate::delay;
use crate::errors::EngineError;
use crate::page::PageDriver;
use crate::queries::QueryTable;

const SEARCH_BOX: &str = "#sb_form_q";

pub struct SearchProtocol;

impl SearchProtocol {
    pub async fn run(
        page: &dyn PageDriver,
        executor: &ClickExecutor,
        queries: &QueryTable,
        title: &str,
    ) -> Result<(), EngineError> {
        let query = Self::pick_query(queries, title);
        info!("{}: searching for {:?}", title, query);

        protocol_click(page, executor, SEARCH_BOX).await?;
        delay::human_delay(400, 300).await;

        page.type_text(&query).await?;
        delay::human_delay(300, 200).await;
        page.press_enter().await?;

        // Let the results page load and register the visit
        let _ = page.wait_for_navigation(Duration::from_secs(5)).await;
        delay::random_delay(2_000, 4_000).await;

        Ok(())
    }

    fn pick_query(queries: &QueryTable, title: &str) -> String {
        match queries.lookup(title) {
            Some(canned) if !canned.is_empty() => {
                let pick = rand::thread_rng().gen_range(0..canned.len());
                canned[pick].clone()
            }
            _ => {
                debug!("no canned query for {:?}, using literal title", title);
                title.to_string()
            }
        }
    }
}
