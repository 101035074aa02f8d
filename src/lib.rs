pub mod admin;
#[cfg(feature = "ssr")]
pub mod api;
pub mod app;
pub mod client;
#[cfg(feature = "ssr")]
pub mod config;
pub mod listing;
pub mod model;
#[cfg(feature = "ssr")]
pub mod schema;

#[cfg(feature = "ssr")]
use diesel::connection::SimpleConnection;
#[cfg(feature = "ssr")]
use diesel::prelude::*;
#[cfg(feature = "ssr")]
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PoolError};
#[cfg(feature = "ssr")]
use diesel::result::ConnectionError;
#[cfg(feature = "ssr")]
use diesel::SqliteConnection;
#[cfg(feature = "ssr")]
use dotenvy::dotenv;
#[cfg(feature = "ssr")]
use std::env;
#[cfg(feature = "ssr")]
use uuid::Uuid;

#[cfg(feature = "ssr")]
use crate::model::{Contest, ContestUpdate, NewAdminSession, NewContest};
#[cfg(feature = "ssr")]
use crate::schema::{admin_sessions, contests};

#[cfg(feature = "ssr")]
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    use crate::app::*;
    console_error_panic_hook::set_once();
    leptos::mount::hydrate_body(App);
}

/// Enables WAL mode to allow concurrent reads during writes, and a timeout to retry locked
/// operations.
#[cfg(feature = "ssr")]
pub fn apply_pragmas(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute(
        "PRAGMA foreign_keys = ON; \
        PRAGMA journal_mode = WAL; \
        PRAGMA synchronous = NORMAL; \
        PRAGMA busy_timeout = 10000;",
    )
}

/// Opens a single connection to `DATABASE_URL` (read from `.env` if present).
#[cfg(feature = "ssr")]
pub fn establish_connection() -> ConnectionResult<SqliteConnection> {
    dotenv().ok();
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| ConnectionError::InvalidConnectionUrl("DATABASE_URL is not set".into()))?;
    establish_connection_to(&database_url)
}

#[cfg(feature = "ssr")]
pub fn establish_connection_to(database_url: &str) -> ConnectionResult<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)?;
    apply_pragmas(&mut conn).map_err(ConnectionError::CouldntSetupConfiguration)?;
    Ok(conn)
}

#[cfg(feature = "ssr")]
#[derive(Debug)]
struct SqlitePragmas;

#[cfg(feature = "ssr")]
impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        apply_pragmas(conn).map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Builds the connection pool shared by the API handlers. Every pooled connection gets the same
/// PRAGMAs as `establish_connection`.
#[cfg(feature = "ssr")]
pub fn build_pool(database_url: &str, max_size: u32) -> Result<DbPool, PoolError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
}

/// Creates the tables if they don't exist yet. Safe to run on every start.
#[cfg(feature = "ssr")]
pub fn init_schema(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute(
        "CREATE TABLE IF NOT EXISTS contests ( \
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, \
            class_level INTEGER NOT NULL, \
            year INTEGER NOT NULL, \
            pre_number INTEGER NOT NULL, \
            contest_url TEXT, \
            solution_url TEXT \
        ); \
        CREATE INDEX IF NOT EXISTS idx_contests_class_year ON contests (class_level, year); \
        CREATE TABLE IF NOT EXISTS admin_sessions ( \
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, \
            token TEXT NOT NULL UNIQUE, \
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP \
        );",
    )
}

/// Returns every contest, newest year first and then by pre number.
#[cfg(feature = "ssr")]
pub fn get_all_contests(conn: &mut SqliteConnection) -> QueryResult<Vec<Contest>> {
    contests::table
        .order((
            contests::year.desc(),
            contests::pre_number.asc(),
            contests::id.asc(),
        ))
        .select(Contest::as_select())
        .load(conn)
}

#[cfg(feature = "ssr")]
pub fn get_contest(conn: &mut SqliteConnection, contest_id: i32) -> QueryResult<Contest> {
    contests::table
        .filter(contests::id.eq(contest_id))
        .select(Contest::as_select())
        .first(conn)
}

/// Contests for one class level, ordered like `get_all_contests`. The caller checks the range.
#[cfg(feature = "ssr")]
pub fn get_contests_by_class(
    conn: &mut SqliteConnection,
    class_level: i32,
) -> QueryResult<Vec<Contest>> {
    contests::table
        .filter(contests::class_level.eq(class_level))
        .order((
            contests::year.desc(),
            contests::pre_number.asc(),
            contests::id.asc(),
        ))
        .select(Contest::as_select())
        .load(conn)
}

/// Contests held in one year, ordered by class level and then pre number.
#[cfg(feature = "ssr")]
pub fn get_contests_by_year(conn: &mut SqliteConnection, year: i32) -> QueryResult<Vec<Contest>> {
    contests::table
        .filter(contests::year.eq(year))
        .order((
            contests::class_level.asc(),
            contests::pre_number.asc(),
            contests::id.asc(),
        ))
        .select(Contest::as_select())
        .load(conn)
}

/// Inserts a contest and returns the stored row. Validation happens before this is called.
#[cfg(feature = "ssr")]
pub fn create_contest(conn: &mut SqliteConnection, new_contest: &NewContest) -> QueryResult<Contest> {
    diesel::insert_into(contests::table)
        .values(new_contest)
        .returning(Contest::as_returning())
        .get_result(conn)
}

/// Merges `update` over the stored contest and writes the whole row back.
/// Returns NotFound if there is no contest with this id. The merged row is handed to
/// `check` before it is written, so callers can reject it without touching the table.
#[cfg(feature = "ssr")]
pub fn update_contest<E, F>(
    conn: &mut SqliteConnection,
    contest_id: i32,
    update: ContestUpdate,
    check: F,
) -> Result<Contest, E>
where
    E: From<diesel::result::Error>,
    F: FnOnce(&NewContest) -> Result<(), E>,
{
    conn.transaction(|conn| {
        let existing = get_contest(conn, contest_id)?;
        let merged = update.apply_to(&existing);
        check(&merged)?;
        let updated = diesel::update(contests::table.filter(contests::id.eq(contest_id)))
            .set(&merged)
            .returning(Contest::as_returning())
            .get_result(conn)?;
        Ok(updated)
    })
}

/// Deletes a contest. Returns NotFound if nothing was deleted.
#[cfg(feature = "ssr")]
pub fn delete_contest(conn: &mut SqliteConnection, contest_id: i32) -> QueryResult<()> {
    let deleted =
        diesel::delete(contests::table.filter(contests::id.eq(contest_id))).execute(conn)?;
    if deleted == 0 {
        return Err(diesel::result::Error::NotFound);
    }
    Ok(())
}

/// Creates an admin session and returns the token.
#[cfg(feature = "ssr")]
pub fn create_admin_session(conn: &mut SqliteConnection) -> QueryResult<String> {
    let token_str = Uuid::new_v4().to_string();
    let new_session = NewAdminSession {
        token: token_str.clone(),
    };
    diesel::insert_into(admin_sessions::table)
        .values(&new_session)
        .execute(conn)?;
    Ok(token_str)
}

/// Validates an admin token. Returns true if the provided token exists in the admin_sessions
/// table.
#[cfg(feature = "ssr")]
pub fn validate_admin_token(conn: &mut SqliteConnection, token: &str) -> QueryResult<bool> {
    if Uuid::parse_str(token).is_err() {
        return Ok(false);
    }
    let count: i64 = admin_sessions::table
        .filter(admin_sessions::token.eq(token))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

/// Removes an admin session. Unknown tokens are ignored.
#[cfg(feature = "ssr")]
pub fn revoke_admin_session(conn: &mut SqliteConnection, token: &str) -> QueryResult<usize> {
    diesel::delete(admin_sessions::table.filter(admin_sessions::token.eq(token))).execute(conn)
}

/// The contests a fresh installation starts with.
#[cfg(feature = "ssr")]
pub fn sample_contests() -> Vec<NewContest> {
    let sample = |class_level: i32, year: i32, pre_number: i32, contest: &str, solution: &str| {
        NewContest {
            class_level,
            year,
            pre_number,
            contest_url: Some(contest.to_string()),
            solution_url: Some(solution.to_string()),
        }
    };

    vec![
        sample(9, 2025, 1, "https://codeforces.com/", "https://codeforces.com/blog/entry/1/"),
        sample(9, 2025, 2, "https://codeforces.com/", "https://codeforces.com/blog/entry/2/"),
        sample(9, 2025, 3, "https://codeforces.com/", "https://codeforces.com/blog/entry/3/"),
        sample(10, 2025, 1, "https://atcoder.jp/", "https://atcoder.jp/contests/abc001/editorial"),
        sample(10, 2025, 2, "https://atcoder.jp/", "https://atcoder.jp/contests/abc002/editorial"),
        sample(10, 2025, 3, "https://atcoder.jp/", "https://atcoder.jp/contests/abc003/editorial"),
        sample(11, 2025, 1, "https://www.codechef.com/", "https://discuss.codechef.com/"),
        sample(11, 2025, 2, "https://www.codechef.com/", "https://discuss.codechef.com/"),
        sample(11, 2025, 3, "https://www.codechef.com/", "https://discuss.codechef.com/"),
        sample(12, 2025, 1, "https://projecteuler.net/", "https://projecteuler.net/thread=1"),
        sample(12, 2025, 2, "https://projecteuler.net/", "https://projecteuler.net/thread=2"),
        sample(12, 2025, 3, "https://projecteuler.net/", "https://projecteuler.net/thread=3"),
        sample(9, 2024, 1, "https://codeforces.com/", "https://codeforces.com/blog/entry/100/"),
        sample(10, 2024, 1, "https://atcoder.jp/", "https://atcoder.jp/contests/abc100/editorial"),
    ]
}

/// Inserts the sample contests if the table is empty. Returns the number of inserted rows, which
/// is zero when the table already had data.
#[cfg(feature = "ssr")]
pub fn seed_sample_contests(conn: &mut SqliteConnection) -> QueryResult<usize> {
    conn.transaction(|conn| {
        let existing: i64 = contests::table.count().get_result(conn)?;
        if existing > 0 {
            return Ok(0);
        }
        let mut inserted = 0;
        for contest in sample_contests() {
            inserted += diesel::insert_into(contests::table)
                .values(&contest)
                .execute(conn)?;
        }
        Ok(inserted)
    })
}

/// Removes every contest and admin session.
#[cfg(feature = "ssr")]
pub fn reset_database(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.transaction(|conn| {
        diesel::delete(admin_sessions::table).execute(conn)?;
        diesel::delete(contests::table).execute(conn)?;
        Ok(())
    })
}

#[cfg(all(test, feature = "ssr"))]
mod tests {
    use super::*;
    use crate::model::{AdminSession, InvalidContest};

    // Helper to run a test in a transaction against a fresh in-memory database. The transaction
    // is always rolled back at the end of the test.
    fn run_test_in_transaction<F>(test_fn: F)
    where
        F: FnOnce(&mut SqliteConnection) -> Result<(), diesel::result::Error>,
    {
        let mut conn = establish_connection_to(":memory:").expect("in-memory database");
        init_schema(&mut conn).expect("schema");
        let result: Result<(), diesel::result::Error> = conn.transaction(|conn| {
            test_fn(conn)?;
            // Force rollback on test success by returning an error.
            Err(diesel::result::Error::RollbackTransaction)
        });
        assert!(matches!(
            result,
            Err(diesel::result::Error::RollbackTransaction)
        ));
    }

    fn new_contest(class_level: i32, year: i32, pre_number: i32) -> NewContest {
        NewContest {
            class_level,
            year,
            pre_number,
            contest_url: Some("https://codeforces.com/".to_string()),
            solution_url: None,
        }
    }

    fn accept(_: &NewContest) -> Result<(), diesel::result::Error> {
        Ok(())
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        run_test_in_transaction(|conn| {
            init_schema(conn)?;
            let count: i64 = contests::table.count().get_result(conn)?;
            assert_eq!(count, 0);

            Ok(())
        });
    }

    #[test]
    fn test_create_then_fetch_contains_record_once() {
        run_test_in_transaction(|conn| {
            let created = create_contest(conn, &new_contest(11, 2023, 4))?;
            assert!(created.id > 0);
            assert_eq!(created.class_level, 11);
            assert_eq!(created.year, 2023);
            assert_eq!(created.pre_number, 4);
            assert_eq!(created.solution_url, None);

            let all = get_all_contests(conn)?;
            let matching = all
                .iter()
                .filter(|c| NewContest::from(*c) == new_contest(11, 2023, 4))
                .count();
            assert_eq!(matching, 1);

            assert_eq!(get_contest(conn, created.id)?, created);

            Ok(())
        });
    }

    #[test]
    fn test_get_all_contests_order() {
        run_test_in_transaction(|conn| {
            create_contest(conn, &new_contest(9, 2022, 1))?;
            create_contest(conn, &new_contest(9, 2023, 2))?;
            create_contest(conn, &new_contest(10, 2023, 1))?;
            create_contest(conn, &new_contest(9, 2023, 1))?;

            let order: Vec<(i32, i32)> = get_all_contests(conn)?
                .iter()
                .map(|c| (c.year, c.pre_number))
                .collect();
            assert_eq!(order, vec![(2023, 1), (2023, 1), (2023, 2), (2022, 1)]);

            Ok(())
        });
    }

    #[test]
    fn test_get_contests_by_class_and_year() {
        run_test_in_transaction(|conn| {
            create_contest(conn, &new_contest(9, 2022, 1))?;
            create_contest(conn, &new_contest(12, 2023, 2))?;
            create_contest(conn, &new_contest(9, 2023, 3))?;
            create_contest(conn, &new_contest(10, 2023, 1))?;

            let class_nine: Vec<(i32, i32)> = get_contests_by_class(conn, 9)?
                .iter()
                .map(|c| (c.year, c.pre_number))
                .collect();
            assert_eq!(class_nine, vec![(2023, 3), (2022, 1)]);

            let year_2023: Vec<i32> = get_contests_by_year(conn, 2023)?
                .iter()
                .map(|c| c.class_level)
                .collect();
            assert_eq!(year_2023, vec![9, 10, 12]);

            assert!(get_contests_by_year(conn, 1999)?.is_empty());

            Ok(())
        });
    }

    #[test]
    fn test_get_contest_missing() {
        run_test_in_transaction(|conn| {
            let err = get_contest(conn, 999).expect_err("Should not exist");
            assert!(matches!(err, diesel::result::Error::NotFound));

            Ok(())
        });
    }

    #[test]
    fn test_update_contest_partial() {
        run_test_in_transaction(|conn| {
            let created = create_contest(conn, &new_contest(9, 2023, 1))?;
            let update = ContestUpdate {
                pre_number: Some(2),
                solution_url: Some("https://example.com/solutions".to_string()),
                ..Default::default()
            };
            let updated = update_contest(conn, created.id, update, accept)?;
            assert_eq!(updated.id, created.id);
            assert_eq!(updated.class_level, 9);
            assert_eq!(updated.year, 2023);
            assert_eq!(updated.pre_number, 2);
            assert_eq!(updated.contest_url, created.contest_url);
            assert_eq!(
                updated.solution_url,
                Some("https://example.com/solutions".to_string())
            );

            // Clearing a URL stores NULL.
            let clear = ContestUpdate {
                contest_url: Some(String::new()),
                ..Default::default()
            };
            let cleared = update_contest(conn, created.id, clear, accept)?;
            assert_eq!(cleared.contest_url, None);
            assert_eq!(get_contest(conn, created.id)?.contest_url, None);

            Ok(())
        });
    }

    #[test]
    fn test_update_contest_rejected_by_check_leaves_row() {
        run_test_in_transaction(|conn| {
            let created = create_contest(conn, &new_contest(9, 2023, 1))?;
            let update = ContestUpdate {
                class_level: Some(4),
                ..Default::default()
            };

            #[derive(Debug)]
            enum Failure {
                Db(diesel::result::Error),
                Invalid(InvalidContest),
            }
            impl From<diesel::result::Error> for Failure {
                fn from(e: diesel::result::Error) -> Self {
                    Failure::Db(e)
                }
            }

            let result = update_contest(conn, created.id, update, |merged| {
                merged.validate().map_err(Failure::Invalid)
            });
            assert!(matches!(
                result,
                Err(Failure::Invalid(InvalidContest::ClassLevel(4)))
            ));
            assert_eq!(get_contest(conn, created.id)?, created);

            let missing = update_contest(conn, 999, ContestUpdate::default(), |_| {
                Ok::<(), Failure>(())
            });
            assert!(matches!(
                missing,
                Err(Failure::Db(diesel::result::Error::NotFound))
            ));

            Ok(())
        });
    }

    #[test]
    fn test_delete_contest() {
        run_test_in_transaction(|conn| {
            let keep = create_contest(conn, &new_contest(9, 2023, 1))?;
            let gone = create_contest(conn, &new_contest(9, 2023, 2))?;

            delete_contest(conn, gone.id)?;
            assert!(matches!(
                get_contest(conn, gone.id),
                Err(diesel::result::Error::NotFound)
            ));

            // Deleting again, or deleting something that never existed, leaves the rest alone.
            assert!(matches!(
                delete_contest(conn, gone.id),
                Err(diesel::result::Error::NotFound)
            ));
            assert!(matches!(
                delete_contest(conn, 999),
                Err(diesel::result::Error::NotFound)
            ));
            assert_eq!(get_all_contests(conn)?, vec![keep]);

            Ok(())
        });
    }

    #[test]
    fn test_create_admin_session() {
        run_test_in_transaction(|conn| {
            // Create a session and verify it's inserted.
            let token = create_admin_session(conn)?;
            assert!(Uuid::parse_str(&token).is_ok());

            let session: AdminSession = admin_sessions::table
                .filter(admin_sessions::token.eq(&token))
                .select(AdminSession::as_select())
                .first(conn)?;
            assert_eq!(session.token, token);
            assert!(session.created_at.and_utc().timestamp() > 0);

            Ok(())
        });
    }

    #[test]
    fn test_validate_admin_token() {
        run_test_in_transaction(|conn| {
            let token = create_admin_session(conn)?;
            assert!(validate_admin_token(conn, &token)?);

            assert!(!validate_admin_token(conn, "not-a-uuid")?);
            assert!(!validate_admin_token(conn, &Uuid::new_v4().to_string())?);

            Ok(())
        });
    }

    #[test]
    fn test_revoke_admin_session() {
        run_test_in_transaction(|conn| {
            let token = create_admin_session(conn)?;
            let other = create_admin_session(conn)?;

            assert_eq!(revoke_admin_session(conn, &token)?, 1);
            assert!(!validate_admin_token(conn, &token)?);
            assert!(validate_admin_token(conn, &other)?);

            // Revoking twice is harmless.
            assert_eq!(revoke_admin_session(conn, &token)?, 0);

            Ok(())
        });
    }

    #[test]
    fn test_sample_contests_are_valid() {
        for contest in sample_contests() {
            assert!(contest.validate().is_ok(), "{contest:?}");
        }
    }

    #[test]
    fn test_seed_sample_contests_only_once() {
        run_test_in_transaction(|conn| {
            let inserted = seed_sample_contests(conn)?;
            assert_eq!(inserted, sample_contests().len());

            assert_eq!(seed_sample_contests(conn)?, 0);
            let count: i64 = contests::table.count().get_result(conn)?;
            assert_eq!(count as usize, sample_contests().len());

            Ok(())
        });
    }

    #[test]
    fn test_seed_skips_non_empty_table() {
        run_test_in_transaction(|conn| {
            create_contest(conn, &new_contest(9, 2020, 1))?;
            assert_eq!(seed_sample_contests(conn)?, 0);
            assert_eq!(get_all_contests(conn)?.len(), 1);

            Ok(())
        });
    }

    #[test]
    fn test_reset_database() {
        run_test_in_transaction(|conn| {
            seed_sample_contests(conn)?;
            let token = create_admin_session(conn)?;

            reset_database(conn)?;

            assert!(get_all_contests(conn)?.is_empty());
            assert!(!validate_admin_token(conn, &token)?);

            Ok(())
        });
    }
}
