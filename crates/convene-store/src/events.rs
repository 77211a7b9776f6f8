//! CRUD operations for [`Event`] records, including the atomic arithmetic on
//! the confirmed-attendee counter.

use chrono::{DateTime, Utc};
use rusqlite::params;

use convene_shared::EventId;

use crate::columns;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Event, EventQuery};

const EVENT_COLUMNS: &str = "id, title, description, category_id, max_attendees, \
     confirmed_attendees, start_date, end_date, start_time, end_time, street, city, state, \
     postal_code, organizer_id, is_active, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    pub fn insert_event(&self, event: &Event) -> Result<()> {
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO events ({EVENT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                             ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
                ),
                params![
                    event.id.to_string(),
                    event.title,
                    event.description,
                    event.category_id.map(|c| c.to_string()),
                    event.max_attendees,
                    event.confirmed_attendees,
                    columns::date(&event.start_date),
                    columns::date(&event.end_date),
                    columns::time(&event.start_time),
                    columns::time(&event.end_time),
                    event.street,
                    event.city,
                    event.state,
                    event.postal_code,
                    event.organizer_id.to_string(),
                    event.is_active as i32,
                    columns::ts(&event.created_at),
                    columns::ts(&event.updated_at),
                ],
            )
            .map_err(StoreError::classify)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_event(&self, id: EventId) -> Result<Event> {
        self.conn()
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![id.to_string()],
                row_to_event,
            )
            .map_err(StoreError::classify)
    }

    /// List events matching `query`, soonest first.
    pub fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if !query.include_inactive {
            clauses.push("is_active = 1".to_string());
        }
        if let Some(day) = query.starts_on_or_after {
            bind(&mut clauses, &mut values, "start_date >= ?", columns::date(&day));
        }
        if let Some(day) = query.ended_before {
            bind(&mut clauses, &mut values, "end_date < ?", columns::date(&day));
        }
        if let Some(city) = query.city.as_deref() {
            bind(
                &mut clauses,
                &mut values,
                "city LIKE '%' || ? || '%' ESCAPE '\\'",
                escape_like(city),
            );
        }
        if let Some(state) = query.state.as_deref() {
            bind(
                &mut clauses,
                &mut values,
                "state LIKE '%' || ? || '%' ESCAPE '\\'",
                escape_like(state),
            );
        }
        if let Some(category) = query.category_id {
            bind(&mut clauses, &mut values, "category_id = ?", category.to_string());
        }
        if let Some(organizer) = query.organizer_id {
            bind(&mut clauses, &mut values, "organizer_id = ?", organizer.to_string());
        }

        let mut sql = format!("SELECT {EVENT_COLUMNS} FROM events");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY start_date ASC, start_time ASC, created_at DESC");

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), row_to_event)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Persist the editable fields of `event`.  The counters, organizer and
    /// creation time are left untouched.
    pub fn update_event_details(&self, event: &Event) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE events SET
                title = ?1, description = ?2, category_id = ?3, max_attendees = ?4,
                start_date = ?5, end_date = ?6, start_time = ?7, end_time = ?8,
                street = ?9, city = ?10, state = ?11, postal_code = ?12, updated_at = ?13
             WHERE id = ?14",
            params![
                event.title,
                event.description,
                event.category_id.map(|c| c.to_string()),
                event.max_attendees,
                columns::date(&event.start_date),
                columns::date(&event.end_date),
                columns::time(&event.start_time),
                columns::time(&event.end_time),
                event.street,
                event.city,
                event.state,
                event.postal_code,
                columns::ts(&event.updated_at),
                event.id.to_string(),
            ],
        )?;
        Ok(affected > 0)
    }

    pub fn set_event_active(&self, id: EventId, active: bool, now: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE events SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active as i32, columns::ts(&now), id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Add one confirmed attendee in a single statement.
    ///
    /// With `within_capacity` set the row is only touched while
    /// `confirmed_attendees < max_attendees`; the return value tells whether
    /// the counter moved.
    pub fn increment_confirmed_attendees(
        &self,
        id: EventId,
        within_capacity: bool,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let sql = if within_capacity {
            "UPDATE events SET confirmed_attendees = confirmed_attendees + 1, updated_at = ?1
             WHERE id = ?2 AND confirmed_attendees < max_attendees"
        } else {
            "UPDATE events SET confirmed_attendees = confirmed_attendees + 1, updated_at = ?1
             WHERE id = ?2"
        };
        let affected = self
            .conn()
            .execute(sql, params![columns::ts(&now), id.to_string()])?;
        Ok(affected > 0)
    }

    /// Remove one confirmed attendee in a single statement, never going
    /// below zero.
    pub fn decrement_confirmed_attendees(&self, id: EventId, now: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE events
             SET confirmed_attendees = MAX(0, confirmed_attendees - 1), updated_at = ?1
             WHERE id = ?2",
            params![columns::ts(&now), id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Append `clause` with its single `?` placeholder numbered after `value`.
fn bind(clauses: &mut Vec<String>, values: &mut Vec<String>, clause: &str, value: String) {
    values.push(value);
    clauses.push(clause.replace('?', &format!("?{}", values.len())));
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: columns::id(row, 0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category_id: columns::opt_id(row, 3)?,
        max_attendees: row.get(4)?,
        confirmed_attendees: row.get(5)?,
        start_date: columns::day(row, 6)?,
        end_date: columns::day(row, 7)?,
        start_time: columns::time_of_day(row, 8)?,
        end_time: columns::time_of_day(row, 9)?,
        street: row.get(10)?,
        city: row.get(11)?,
        state: row.get(12)?,
        postal_code: row.get(13)?,
        organizer_id: columns::id(row, 14)?,
        is_active: columns::flag(row, 15)?,
        created_at: columns::instant(row, 16)?,
        updated_at: columns::instant(row, 17)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::test_support::{event, user};

    fn setup() -> (Database, Event) {
        let db = Database::open_in_memory().unwrap();
        let host = user("Hana", "hana@example.com");
        db.insert_user(&host).unwrap();
        let ev = event(host.id, 2);
        db.insert_event(&ev).unwrap();
        (db, ev)
    }

    #[test]
    fn insert_and_fetch() {
        let (db, ev) = setup();
        assert_eq!(db.get_event(ev.id).unwrap(), ev);
    }

    #[test]
    fn counter_arithmetic_is_clamped_at_zero() {
        let (db, ev) = setup();
        let now = Utc::now();

        assert!(db.decrement_confirmed_attendees(ev.id, now).unwrap());
        assert_eq!(db.get_event(ev.id).unwrap().confirmed_attendees, 0);

        db.increment_confirmed_attendees(ev.id, false, now).unwrap();
        db.increment_confirmed_attendees(ev.id, false, now).unwrap();
        db.increment_confirmed_attendees(ev.id, false, now).unwrap();
        assert_eq!(db.get_event(ev.id).unwrap().confirmed_attendees, 3);
    }

    #[test]
    fn capacity_bound_increment_stops_at_max() {
        let (db, ev) = setup();
        let now = Utc::now();

        assert!(db.increment_confirmed_attendees(ev.id, true, now).unwrap());
        assert!(db.increment_confirmed_attendees(ev.id, true, now).unwrap());
        assert!(!db.increment_confirmed_attendees(ev.id, true, now).unwrap());
        assert_eq!(db.get_event(ev.id).unwrap().confirmed_attendees, 2);
    }

    #[test]
    fn list_filters_by_location_and_window() {
        let (db, mut first) = setup();
        first.city = "Lyon".into();
        first.start_date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        first.end_date = NaiveDate::from_ymd_opt(2030, 1, 2).unwrap();
        db.update_event_details(&first).unwrap();

        let mut second = event(first.organizer_id, 5);
        second.city = "Paris_100%".into();
        second.start_date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        second.end_date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        db.insert_event(&second).unwrap();

        let by_city = db
            .list_events(&EventQuery {
                city: Some("lyo".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_city.len(), 1);
        assert_eq!(by_city[0].id, first.id);

        let literal = db
            .list_events(&EventQuery {
                city: Some("_100%".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(literal.len(), 1);
        assert_eq!(literal[0].id, second.id);

        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let past = db
            .list_events(&EventQuery {
                ended_before: Some(today),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].id, second.id);

        let upcoming = db
            .list_events(&EventQuery {
                starts_on_or_after: Some(today),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, first.id);
    }

    #[test]
    fn inactive_events_are_hidden_by_default() {
        let (db, ev) = setup();
        db.set_event_active(ev.id, false, Utc::now()).unwrap();

        assert!(db.list_events(&EventQuery::default()).unwrap().is_empty());
        let all = db
            .list_events(&EventQuery {
                include_inactive: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].is_active);
    }
}
