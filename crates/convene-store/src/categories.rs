use rusqlite::params;

use convene_shared::CategoryId;

use crate::columns;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Category;

impl Database {
    pub fn insert_category(&self, category: &Category) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO categories (id, name, description, icon) VALUES (?1, ?2, ?3, ?4)",
                params![
                    category.id.to_string(),
                    category.name,
                    category.description,
                    category.icon,
                ],
            )
            .map_err(StoreError::classify)?;
        Ok(())
    }

    pub fn get_category(&self, id: CategoryId) -> Result<Category> {
        self.conn()
            .query_row(
                "SELECT id, name, description, icon FROM categories WHERE id = ?1",
                params![id.to_string()],
                row_to_category,
            )
            .map_err(StoreError::classify)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, name, description, icon FROM categories ORDER BY name ASC")?;
        let rows = stmt.query_map([], row_to_category)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: columns::id(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
    })
}
