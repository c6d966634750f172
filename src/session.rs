//! One operator's pass over one category.
//!
//! The session keeps the eligible set it derived at load time and pages
//! through it with a [`BatchCursor`]. Rows completed during a pass are not
//! presented again because the cursor only moves forward; once it wraps the
//! eligible set is derived afresh.

use std::num::NonZeroUsize;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    ErrorContext, ErrorDetail,
    config::{Category, Columns, MergeMode},
    cursor::BatchCursor,
    notify::Notifier,
    prompt,
    reconcile::{
        apply_edits, derive_eligible, merge_into_updated, restore_completion_state, touched_rows,
    },
    record::{Dataset, RecordKey},
    store::{self, BlobStore, StoreError},
};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub batch_size: NonZeroUsize,
    pub merge_mode: MergeMode,
    /// Also rewrite the base blob with the full edited dataset.
    pub write_back_base: bool,
    pub topic: String,
}

/// State a front end carries between sessions or re-renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub offsets: IndexMap<String, usize>,
    /// Categories whose exhaustion has already been announced.
    #[serde(default)]
    pub notified: IndexSet<String>,
}

impl SessionState {
    pub fn offset(&self, category: &str) -> usize {
        self.offsets.get(category).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    /// Row position in the base dataset.
    pub position: usize,
    pub key: RecordKey,
    pub title: String,
    pub description: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub touched: IndexSet<String>,
    pub wrapped: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub rows: usize,
    pub products: usize,
    pub done_products: usize,
    pub eligible: usize,
}

pub struct ReviewSession<S, N> {
    store: S,
    notifier: N,
    name: String,
    category: Category,
    columns: Columns,
    options: SessionOptions,
    base: Dataset,
    updated: Dataset,
    eligible: Vec<usize>,
    cursor: BatchCursor,
    state: SessionState,
}

fn check_columns<'a>(
    blob: &str,
    dataset: &Dataset,
    columns: impl IntoIterator<Item = &'a str>,
) -> Result<(), crate::Error> {
    let missing = dataset.missing_columns(columns);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ErrorContext::new(blob).error(ErrorDetail::MissingColumns(missing)))
    }
}

impl<S, N> ReviewSession<S, N>
where
    S: BlobStore,
    S::Error: std::fmt::Display,
    N: Notifier,
    N::Error: std::fmt::Display,
{
    pub async fn open(
        store: S,
        notifier: N,
        name: impl Into<String>,
        category: Category,
        columns: Columns,
        options: SessionOptions,
        state: SessionState,
    ) -> Result<Self, StoreError<S::Error>> {
        let name = name.into();
        let mut base = store::load_dataset_or_empty(&store, &category.base).await?;
        check_columns(&category.base, &base, columns.required()).map_err(StoreError::Dataset)?;
        let updated = store::load_dataset_or_empty(&store, &category.updated).await?;
        if !updated.is_empty() {
            check_columns(
                &category.updated,
                &updated,
                [columns.handle.as_str(), columns.completion.as_str()],
            )
            .map_err(StoreError::Dataset)?;
        }
        restore_completion_state(&mut base, &updated, &columns);
        let eligible = derive_eligible(&base, &columns);
        let cursor = BatchCursor::restore(state.offset(&name), options.batch_size, eligible.len());
        info!(
            category = %name,
            rows = base.len(),
            logged = updated.len(),
            eligible = eligible.len(),
            offset = cursor.offset(),
            "opened review session"
        );
        let mut session = Self {
            store,
            notifier,
            name,
            category,
            columns,
            options,
            base,
            updated,
            eligible,
            cursor,
            state,
        };
        session.notify_if_exhausted().await;
        Ok(session)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn base(&self) -> &Dataset {
        &self.base
    }

    pub fn updated(&self) -> &Dataset {
        &self.updated
    }

    pub fn cursor(&self) -> &BatchCursor {
        &self.cursor
    }

    pub fn eligible(&self) -> &[usize] {
        &self.eligible
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }

    pub fn summary(&self) -> Summary {
        let mut products = IndexMap::<&str, bool>::new();
        for row in self.base.rows() {
            *products.entry(row.handle(&self.columns)).or_default() |= row.is_done(&self.columns);
        }
        Summary {
            rows: self.base.len(),
            products: products.len(),
            done_products: products.values().filter(|done| **done).count(),
            eligible: self.eligible.len(),
        }
    }

    fn entry(&self, position: usize) -> PageEntry {
        let row = &self.base.rows()[position];
        PageEntry {
            position,
            key: row.key(&self.columns),
            title: row.text(&self.columns.title).to_owned(),
            description: row.text(&self.columns.description).to_owned(),
            prompt: prompt::description_prompt(row, &self.columns),
        }
    }

    /// The rows under the cursor.
    pub fn page(&self) -> Vec<PageEntry> {
        self.eligible[self.cursor.next_slice()]
            .iter()
            .map(|&position| self.entry(position))
            .collect()
    }

    pub fn eligible_entries(&self) -> Vec<PageEntry> {
        self.eligible
            .iter()
            .map(|&position| self.entry(position))
            .collect()
    }

    /// Applies the operator's text and persists the touched rows into the
    /// updated log, then advances the cursor. Blank entries are skipped. If
    /// the log write fails nothing in the session changes. The base
    /// write-back happens after the log write, so its failure leaves the
    /// edits committed to the log (and to the session) while the base blob
    /// keeps its old content and the cursor stays put. The next open
    /// restores completion from the log, so those records are not offered
    /// again.
    pub async fn submit(
        &mut self,
        edits: IndexMap<RecordKey, String>,
    ) -> Result<SubmitOutcome, StoreError<S::Error>> {
        let mut base = self.base.clone();
        let touched = apply_edits(&mut base, &self.columns, &edits);
        if !touched.is_empty() {
            let keys = edits
                .iter()
                .filter(|(_, text)| !text.trim().is_empty())
                .map(|(key, _)| key);
            let updated = merge_into_updated(
                &self.updated,
                touched_rows(&base, &self.columns, keys),
                &self.columns,
                self.options.merge_mode,
            );
            store::save_dataset(&self.store, &self.category.updated, &updated).await?;
            self.updated = updated;
            self.base = base;
            if self.options.write_back_base {
                store::save_dataset(&self.store, &self.category.base, &self.base).await?;
            }
            info!(
                category = %self.name,
                products = touched.len(),
                "persisted edits"
            );
        } else {
            debug!(category = %self.name, "nothing to persist");
        }

        let wrapped = self.cursor.advance();
        self.state
            .offsets
            .insert(self.name.clone(), self.cursor.offset());
        if wrapped {
            self.reload().await;
        }
        Ok(SubmitOutcome { touched, wrapped })
    }

    /// Re-derives completion state and the eligible set from what the
    /// session holds, restarting the cursor.
    pub async fn reload(&mut self) {
        restore_completion_state(&mut self.base, &self.updated, &self.columns);
        self.eligible = derive_eligible(&self.base, &self.columns);
        self.cursor = BatchCursor::new(self.options.batch_size, self.eligible.len());
        self.state.offsets.insert(self.name.clone(), 0);
        debug!(
            category = %self.name,
            eligible = self.eligible.len(),
            "reloaded eligible set"
        );
        self.notify_if_exhausted().await;
    }

    async fn notify_if_exhausted(&mut self) {
        if !self.eligible.is_empty() || self.state.notified.contains(&self.name) {
            return;
        }
        self.state.notified.insert(self.name.clone());
        let subject = format!("{} descriptions complete", self.category.label);
        let message = format!(
            "Every record in {} ({}) has a reviewed description.",
            self.category.label, self.category.base
        );
        if let Err(error) = self
            .notifier
            .publish(&self.options.topic, &subject, &message)
            .await
        {
            warn!(%error, category = %self.name, "failed to publish notification");
        }
    }
}
