use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mise_types::{
    GeneratedImage, Ingredient, NewProduct, Product, ProductId, RecipeRun, RunId, RunStatus,
    Stage, StageTask, TaskState,
};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OptionalExtension, params};

use crate::{Result, StoreError};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

const RUN_COLUMNS: &str = "id, product_id, status, ingredients_json, steps_json, html, publish_link, created_at, updated_at";
const PRODUCT_COLUMNS: &str =
    "id, name, brand, category, description, reference_image, created_at";

/// Repository over SQLite for catalog products, recipe runs and their
/// artifacts.
///
/// Thread-safe via internal `Mutex<Connection>`.
pub struct RecipeStore {
    conn: Mutex<Connection>,
}

impl RecipeStore {
    /// Open (or create) the database at `path` and run pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let mut store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        tracing::debug!(path = %path.display(), "recipe store opened");
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let mut store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&mut self) -> Result<()> {
        embedded::migrations::runner()
            .run(self.conn.get_mut())
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    // ── Products ────────────────────────────────────────────────────

    pub fn create_product(&self, new: &NewProduct) -> Result<Product> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid {
                field: "product name",
                reason: "must not be empty".to_string(),
            });
        }
        let now = Utc::now();
        let reference = new
            .reference_image
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());

        let conn = self.conn();
        conn.execute(
            "INSERT INTO products (name, brand, category, description, reference_image, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                name,
                new.brand,
                new.category,
                new.description,
                reference,
                now.to_rfc3339()
            ],
        )?;

        Ok(Product {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            brand: new.brand.clone(),
            category: new.category.clone(),
            description: new.description.clone(),
            reference_image: new.reference_image.clone(),
            created_at: now,
        })
    }

    pub fn get_product(&self, id: ProductId) -> Result<Product> {
        self.conn()
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
                params![id],
                row_to_product,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    pub fn list_products(&self) -> Result<Vec<Product>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"
        ))?;
        let iter = stmt.query_map([], row_to_product)?;
        let mut products = Vec::new();
        for p in iter {
            products.push(p?);
        }
        Ok(products)
    }

    // ── Recipe runs ─────────────────────────────────────────────────

    /// Create a run in `pending` for an existing product.
    pub fn create_run(&self, product_id: ProductId) -> Result<RecipeRun> {
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let conn = self.conn();

        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM products WHERE id = ?1",
                params![product_id],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !exists {
            return Err(StoreError::not_found("product", product_id));
        }

        conn.execute(
            "INSERT INTO recipe_runs (product_id, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![product_id, RunStatus::Pending.as_str(), now_str, now_str],
        )?;

        Ok(RecipeRun {
            id: conn.last_insert_rowid(),
            product_id,
            status: RunStatus::Pending,
            ingredients_json: None,
            steps_json: None,
            html: None,
            publish_link: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_run(&self, id: RunId) -> Result<RecipeRun> {
        fetch_run(&self.conn(), id)
    }

    /// Runs of a product, newest first.
    pub fn list_runs(&self, product_id: ProductId) -> Result<Vec<RecipeRun>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM recipe_runs WHERE product_id = ?1 ORDER BY id DESC"
        ))?;
        let iter = stmt.query_map(params![product_id], row_to_run)?;
        let mut runs = Vec::new();
        for r in iter {
            runs.push(r?);
        }
        Ok(runs)
    }

    /// Move a run to `status`, refreshing `updated_at`.
    ///
    /// The read and the write happen in one transaction, so concurrent
    /// writers cannot interleave a regression.
    pub fn set_status(&self, id: RunId, status: RunStatus) -> Result<RecipeRun> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let current = fetch_run(&tx, id)?.status;
        if !current.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: current,
                to: status,
            });
        }
        tx.execute(
            "UPDATE recipe_runs SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), Utc::now().to_rfc3339(), id],
        )?;
        let run = fetch_run(&tx, id)?;
        tx.commit()?;

        tracing::debug!(run_id = id, from = %current, to = %status, "run status changed");
        Ok(run)
    }

    /// Serialize both lists onto the run record.
    pub fn save_artifacts(
        &self,
        id: RunId,
        ingredients: &[Ingredient],
        steps: &[String],
    ) -> Result<RecipeRun> {
        let ingredients_json = serde_json::to_string(ingredients)?;
        let steps_json = serde_json::to_string(steps)?;
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE recipe_runs SET ingredients_json = ?1, steps_json = ?2, updated_at = ?3
             WHERE id = ?4",
            params![ingredients_json, steps_json, Utc::now().to_rfc3339(), id],
        )?;
        if updated == 0 {
            return Err(StoreError::not_found("recipe run", id));
        }
        fetch_run(&conn, id)
    }

    pub fn save_html(&self, id: RunId, html: &str) -> Result<RecipeRun> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE recipe_runs SET html = ?1, updated_at = ?2 WHERE id = ?3",
            params![html, Utc::now().to_rfc3339(), id],
        )?;
        if updated == 0 {
            return Err(StoreError::not_found("recipe run", id));
        }
        fetch_run(&conn, id)
    }

    // ── Generated images ────────────────────────────────────────────

    /// Record the image of one step, replacing any earlier record for it.
    pub fn record_image(
        &self,
        run_id: RunId,
        step_index: usize,
        path: &Path,
        prompt_meta: Option<&str>,
        seed: Option<&str>,
    ) -> Result<GeneratedImage> {
        let now = Utc::now();
        self.conn().execute(
            "INSERT INTO generated_images (run_id, step_index, path, prompt_meta, seed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (run_id, step_index) DO UPDATE SET
                path = excluded.path,
                prompt_meta = excluded.prompt_meta,
                seed = excluded.seed,
                created_at = excluded.created_at",
            params![
                run_id,
                step_index as i64,
                path.to_string_lossy(),
                prompt_meta,
                seed,
                now.to_rfc3339()
            ],
        )?;

        Ok(GeneratedImage {
            run_id,
            step_index,
            path: path.to_path_buf(),
            prompt_meta: prompt_meta.map(String::from),
            seed: seed.map(String::from),
            created_at: now,
        })
    }

    /// Images of a run ordered by step index.
    pub fn list_images(&self, run_id: RunId) -> Result<Vec<GeneratedImage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT run_id, step_index, path, prompt_meta, seed, created_at
             FROM generated_images WHERE run_id = ?1 ORDER BY step_index",
        )?;
        let iter = stmt.query_map(params![run_id], |row| {
            Ok(GeneratedImage {
                run_id: row.get(0)?,
                step_index: row.get::<_, i64>(1)? as usize,
                path: PathBuf::from(row.get::<_, String>(2)?),
                prompt_meta: row.get(3)?,
                seed: row.get(4)?,
                created_at: parse_dt(&row.get::<_, String>(5)?),
            })
        })?;
        let mut images = Vec::new();
        for i in iter {
            images.push(i?);
        }
        Ok(images)
    }

    // ── Stage tasks ─────────────────────────────────────────────────

    /// Mark a stage as `running`, resetting any earlier entry.
    pub fn start_stage(&self, run_id: RunId, stage: Stage) -> Result<()> {
        let now_str = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO stage_tasks (run_id, stage, status, error, created_at, updated_at)
             VALUES (?1, ?2, ?3, NULL, ?4, ?4)
             ON CONFLICT (run_id, stage) DO UPDATE SET
                status = excluded.status,
                error = NULL,
                updated_at = excluded.updated_at",
            params![run_id, stage.as_str(), TaskState::Running.as_str(), now_str],
        )?;
        Ok(())
    }

    /// Close a stage as `done` (no error) or `error` (with message).
    pub fn finish_stage(&self, run_id: RunId, stage: Stage, error: Option<&str>) -> Result<()> {
        let state = if error.is_some() {
            TaskState::Error
        } else {
            TaskState::Done
        };
        let updated = self.conn().execute(
            "UPDATE stage_tasks SET status = ?1, error = ?2, updated_at = ?3
             WHERE run_id = ?4 AND stage = ?5",
            params![
                state.as_str(),
                error,
                Utc::now().to_rfc3339(),
                run_id,
                stage.as_str()
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::not_found(
                "stage task",
                format!("{run_id}/{stage}"),
            ));
        }
        Ok(())
    }

    /// Stage log of a run, in pipeline order.
    pub fn stage_tasks(&self, run_id: RunId) -> Result<Vec<StageTask>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT run_id, stage, status, error, created_at, updated_at
             FROM stage_tasks WHERE run_id = ?1
             ORDER BY CASE stage WHEN 'recipe' THEN 0 WHEN 'images' THEN 1 ELSE 2 END",
        )?;
        let iter = stmt.query_map(params![run_id], |row| {
            Ok(StageTask {
                run_id: row.get(0)?,
                stage: parse_col(row, 1)?,
                state: parse_col(row, 2)?,
                error: row.get(3)?,
                created_at: parse_dt(&row.get::<_, String>(4)?),
                updated_at: parse_dt(&row.get::<_, String>(5)?),
            })
        })?;
        let mut tasks = Vec::new();
        for t in iter {
            tasks.push(t?);
        }
        Ok(tasks)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn fetch_run(conn: &Connection, id: RunId) -> Result<RecipeRun> {
    conn.query_row(
        &format!("SELECT {RUN_COLUMNS} FROM recipe_runs WHERE id = ?1"),
        params![id],
        row_to_run,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("recipe run", id))
}

pub(crate) fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Read a text column through `FromStr`.
fn parse_col<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecipeRun> {
    Ok(RecipeRun {
        id: row.get(0)?,
        product_id: row.get(1)?,
        status: parse_col(row, 2)?,
        ingredients_json: row.get(3)?,
        steps_json: row.get(4)?,
        html: row.get(5)?,
        publish_link: row.get(6)?,
        created_at: parse_dt(&row.get::<_, String>(7)?),
        updated_at: parse_dt(&row.get::<_, String>(8)?),
    })
}

fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        brand: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        reference_image: row.get::<_, Option<String>>(5)?.map(PathBuf::from),
        created_at: parse_dt(&row.get::<_, String>(6)?),
    })
}
