use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tokio::sync::mpsc;

use crate::workflows::accommodations::{
    Accommodation, AccommodationId, AccommodationRepository, NewAccommodation, Occupancy,
};
use crate::workflows::accounts::{
    NewUser, PasswordHash, Role, StudentProfile, User, UserId, UserRepository,
};
use crate::workflows::applications::{
    Application, ApplicationId, ApplicationRepository, ApplicationStatus, NewApplication,
};
use crate::workflows::error::RepositoryError;
use crate::workflows::invoices::{
    Invoice, InvoiceId, InvoiceRepository, NewInvoice, PaymentRecord,
};
use crate::workflows::leases::{Lease, LeaseId, LeaseRepository, NewLease};
use crate::workflows::maintenance::{
    MaintenanceId, MaintenanceRepository, MaintenanceRequest, MaintenanceStatus,
    NewMaintenanceRequest, StatusChange,
};
use crate::workflows::notifications::{
    NewNotification, Notification, NotificationId, NotificationRepository,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE COLLATE NOCASE,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        password TEXT NOT NULL,
        role TEXT NOT NULL,
        phone TEXT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        last_login TEXT
    )",
    "CREATE TABLE IF NOT EXISTS student_profiles (
        user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
        student_number TEXT,
        date_of_birth TEXT,
        gender TEXT,
        id_number TEXT,
        address TEXT,
        emergency_contact_name TEXT,
        emergency_contact_phone TEXT,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS accommodations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        location TEXT NOT NULL,
        description TEXT NOT NULL,
        rooms_available INTEGER NOT NULL,
        price_per_month TEXT NOT NULL,
        admin_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS applications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        accommodation_id INTEGER NOT NULL REFERENCES accommodations(id),
        status TEXT NOT NULL,
        move_in_date TEXT,
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS leases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        accommodation_id INTEGER NOT NULL REFERENCES accommodations(id),
        application_id INTEGER UNIQUE REFERENCES applications(id),
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL,
        monthly_rent TEXT NOT NULL,
        security_deposit TEXT NOT NULL,
        signed INTEGER NOT NULL DEFAULT 0,
        signed_at TEXT,
        terminated_on TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS invoices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        accommodation_id INTEGER NOT NULL REFERENCES accommodations(id),
        lease_id INTEGER NOT NULL REFERENCES leases(id),
        amount TEXT NOT NULL,
        late_fee TEXT NOT NULL,
        period_start TEXT NOT NULL,
        period_end TEXT NOT NULL,
        due_date TEXT NOT NULL,
        paid INTEGER NOT NULL DEFAULT 0,
        paid_at TEXT,
        payment_method TEXT,
        reference_number TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS maintenance_requests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        accommodation_id INTEGER NOT NULL REFERENCES accommodations(id),
        issue TEXT NOT NULL,
        description TEXT NOT NULL,
        priority TEXT NOT NULL,
        status TEXT NOT NULL,
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        completed_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        subject TEXT NOT NULL,
        message TEXT NOT NULL,
        kind TEXT NOT NULL,
        is_read INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_leases_accommodation ON leases(accommodation_id)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id)",
];

type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Job = Box<dyn FnOnce(SqlitePool) -> JobFuture + Send>;

/// SQLite-backed store. A dedicated worker thread owns the connection pool and runs
/// queued jobs one at a time, so every repository call observes a consistent database.
pub struct SqliteHousingStore {
    jobs: mpsc::UnboundedSender<Job>,
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict,
            sqlx::Error::RowNotFound => Self::NotFound,
            _ => Self::Unavailable(err.to_string()),
        }
    }
}

fn stopped() -> RepositoryError {
    RepositoryError::Unavailable("sqlite worker stopped".to_string())
}

fn corrupt(column: &str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Unavailable(format!("stored {column} is unreadable: {err}"))
}

impl SqliteHousingStore {
    /// Opens (creating if missing) the database at `url` and applies the schema.
    pub fn connect(url: &str) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        let (ready_tx, ready) = std_mpsc::sync_channel(1);

        thread::Builder::new()
            .name("sqlite-store".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        let _ = ready_tx.send(Err(RepositoryError::Unavailable(err.to_string())));
                        return;
                    }
                };
                runtime.block_on(async move {
                    let pool = match open(options).await {
                        Ok(pool) => pool,
                        Err(err) => {
                            let _ = ready_tx.send(Err(err));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));
                    while let Some(job) = queue.recv().await {
                        job(pool.clone()).await;
                    }
                    pool.close().await;
                });
            })
            .map_err(|err| RepositoryError::Unavailable(err.to_string()))?;

        ready.recv().map_err(|_| stopped())??;
        tracing::info!(url, "sqlite housing store ready");
        Ok(Self { jobs })
    }

    fn call<T, F, Fut>(&self, op: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(SqlitePool) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, RepositoryError>> + Send + 'static,
    {
        let (reply, response) = std_mpsc::sync_channel(1);
        let job: Job = Box::new(move |pool| -> JobFuture {
            Box::pin(async move {
                let _ = reply.send(op(pool).await);
            })
        });
        self.jobs.send(job).map_err(|_| stopped())?;
        response.recv().map_err(|_| stopped())?
    }
}

async fn open(options: SqliteConnectOptions) -> Result<SqlitePool, RepositoryError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(options)
        .await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }
    Ok(pool)
}

fn key(id: u64) -> i64 {
    i64::try_from(id).unwrap_or(i64::MAX)
}

fn id(row: &SqliteRow, column: &str) -> Result<u64, RepositoryError> {
    let value: i64 = row.try_get(column)?;
    u64::try_from(value).map_err(|err| corrupt(column, err))
}

fn optional_id(row: &SqliteRow, column: &str) -> Result<Option<u64>, RepositoryError> {
    let value: Option<i64> = row.try_get(column)?;
    value
        .map(|value| u64::try_from(value).map_err(|err| corrupt(column, err)))
        .transpose()
}

fn decimal(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let text: String = row.try_get(column)?;
    Decimal::from_str(&text).map_err(|err| corrupt(column, err))
}

/// Enums are stored under their JSON names.
fn label<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(text)) => Ok(text),
        Ok(other) => Err(corrupt("label", other)),
        Err(err) => Err(corrupt("label", err)),
    }
}

fn from_label<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T, RepositoryError> {
    let text: String = row.try_get(column)?;
    serde_json::from_value(serde_json::Value::String(text)).map_err(|err| corrupt(column, err))
}

fn count(value: i64) -> usize {
    usize::try_from(value).unwrap_or_default()
}

fn user_row(row: &SqliteRow) -> Result<User, RepositoryError> {
    let password: String = row.try_get("password")?;
    Ok(User {
        id: UserId(id(row, "id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password: PasswordHash::from_encoded(password).map_err(|err| corrupt("password", err))?,
        role: from_label(row, "role")?,
        phone: row.try_get("phone")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        created_at: row.try_get("created_at")?,
        last_login: row.try_get("last_login")?,
    })
}

fn profile_row(row: &SqliteRow) -> Result<StudentProfile, RepositoryError> {
    Ok(StudentProfile {
        user_id: UserId(id(row, "user_id")?),
        student_number: row.try_get("student_number")?,
        date_of_birth: row.try_get("date_of_birth")?,
        gender: row.try_get("gender")?,
        id_number: row.try_get("id_number")?,
        address: row.try_get("address")?,
        emergency_contact_name: row.try_get("emergency_contact_name")?,
        emergency_contact_phone: row.try_get("emergency_contact_phone")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn accommodation_row(row: &SqliteRow) -> Result<Accommodation, RepositoryError> {
    Ok(Accommodation {
        id: AccommodationId(id(row, "id")?),
        name: row.try_get("name")?,
        location: row.try_get("location")?,
        description: row.try_get("description")?,
        rooms_available: row.try_get("rooms_available")?,
        price_per_month: decimal(row, "price_per_month")?,
        admin_id: optional_id(row, "admin_id")?.map(UserId),
        created_at: row.try_get("created_at")?,
    })
}

fn application_row(row: &SqliteRow) -> Result<Application, RepositoryError> {
    Ok(Application {
        id: ApplicationId(id(row, "id")?),
        user_id: UserId(id(row, "user_id")?),
        accommodation_id: AccommodationId(id(row, "accommodation_id")?),
        status: from_label(row, "status")?,
        move_in_date: row.try_get("move_in_date")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn lease_row(row: &SqliteRow) -> Result<Lease, RepositoryError> {
    Ok(Lease {
        id: LeaseId(id(row, "id")?),
        user_id: UserId(id(row, "user_id")?),
        accommodation_id: AccommodationId(id(row, "accommodation_id")?),
        application_id: optional_id(row, "application_id")?.map(ApplicationId),
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        monthly_rent: decimal(row, "monthly_rent")?,
        security_deposit: decimal(row, "security_deposit")?,
        signed: row.try_get("signed")?,
        signed_at: row.try_get("signed_at")?,
        terminated_on: row.try_get("terminated_on")?,
        created_at: row.try_get("created_at")?,
    })
}

fn invoice_row(row: &SqliteRow) -> Result<Invoice, RepositoryError> {
    Ok(Invoice {
        id: InvoiceId(id(row, "id")?),
        user_id: UserId(id(row, "user_id")?),
        accommodation_id: AccommodationId(id(row, "accommodation_id")?),
        lease_id: LeaseId(id(row, "lease_id")?),
        amount: decimal(row, "amount")?,
        late_fee: decimal(row, "late_fee")?,
        period_start: row.try_get("period_start")?,
        period_end: row.try_get("period_end")?,
        due_date: row.try_get("due_date")?,
        paid: row.try_get("paid")?,
        paid_at: row.try_get("paid_at")?,
        payment_method: row.try_get("payment_method")?,
        reference_number: row.try_get("reference_number")?,
        created_at: row.try_get("created_at")?,
    })
}

fn maintenance_row(row: &SqliteRow) -> Result<MaintenanceRequest, RepositoryError> {
    Ok(MaintenanceRequest {
        id: MaintenanceId(id(row, "id")?),
        user_id: UserId(id(row, "user_id")?),
        accommodation_id: AccommodationId(id(row, "accommodation_id")?),
        issue: row.try_get("issue")?,
        description: row.try_get("description")?,
        priority: from_label(row, "priority")?,
        status: from_label(row, "status")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn notification_row(row: &SqliteRow) -> Result<Notification, RepositoryError> {
    Ok(Notification {
        id: NotificationId(id(row, "id")?),
        user_id: UserId(id(row, "user_id")?),
        subject: row.try_get("subject")?,
        message: row.try_get("message")?,
        kind: from_label(row, "kind")?,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn leases_at(
    conn: &mut SqliteConnection,
    accommodation_id: AccommodationId,
) -> Result<Vec<Lease>, RepositoryError> {
    sqlx::query("SELECT * FROM leases WHERE accommodation_id = ? ORDER BY id")
        .bind(key(accommodation_id.0))
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(lease_row)
        .collect()
}

async fn ensure_vacancy(
    conn: &mut SqliteConnection,
    accommodation_id: AccommodationId,
    on: NaiveDate,
) -> Result<(), RepositoryError> {
    let rooms: u32 = sqlx::query_scalar("SELECT rooms_available FROM accommodations WHERE id = ?")
        .bind(key(accommodation_id.0))
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    let leases = leases_at(conn, accommodation_id).await?;
    if Occupancy::from_leases(rooms, &leases, on).has_vacancy() {
        Ok(())
    } else {
        Err(RepositoryError::NoVacancy)
    }
}

async fn push_lease(conn: &mut SqliteConnection, lease: NewLease) -> Result<Lease, RepositoryError> {
    if let Some(application_id) = lease.application_id {
        let issued: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leases WHERE application_id = ?")
            .bind(key(application_id.0))
            .fetch_one(&mut *conn)
            .await?;
        if issued > 0 {
            return Err(RepositoryError::Conflict);
        }
    }
    ensure_vacancy(conn, lease.accommodation_id, lease.created_at.date_naive()).await?;

    let inserted = sqlx::query(
        "INSERT INTO leases (user_id, accommodation_id, application_id, start_date, end_date,
            monthly_rent, security_deposit, signed, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(key(lease.user_id.0))
    .bind(key(lease.accommodation_id.0))
    .bind(lease.application_id.map(|id| key(id.0)))
    .bind(lease.terms.start_date)
    .bind(lease.terms.end_date)
    .bind(lease.terms.monthly_rent.to_string())
    .bind(lease.terms.security_deposit.to_string())
    .bind(lease.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(Lease {
        id: LeaseId(rowid(&inserted)),
        user_id: lease.user_id,
        accommodation_id: lease.accommodation_id,
        application_id: lease.application_id,
        start_date: lease.terms.start_date,
        end_date: lease.terms.end_date,
        monthly_rent: lease.terms.monthly_rent,
        security_deposit: lease.terms.security_deposit,
        signed: false,
        signed_at: None,
        terminated_on: None,
        created_at: lease.created_at,
    })
}

async fn application_by_id(
    conn: &mut SqliteConnection,
    id: ApplicationId,
) -> Result<Application, RepositoryError> {
    let row = sqlx::query("SELECT * FROM applications WHERE id = ?")
        .bind(key(id.0))
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    application_row(&row)
}

async fn lease_by_id(conn: &mut SqliteConnection, id: LeaseId) -> Result<Lease, RepositoryError> {
    let row = sqlx::query("SELECT * FROM leases WHERE id = ?")
        .bind(key(id.0))
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    lease_row(&row)
}

fn rowid(inserted: &sqlx::sqlite::SqliteQueryResult) -> u64 {
    u64::try_from(inserted.last_insert_rowid()).unwrap_or_default()
}

impl UserRepository for SqliteHousingStore {
    fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.call(move |pool| async move {
            let inserted = sqlx::query(
                "INSERT INTO users (username, email, password, role, phone, first_name,
                    last_name, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.password.as_str())
            .bind(label(&user.role)?)
            .bind(&user.phone)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.created_at)
            .execute(&pool)
            .await?;
            Ok(User {
                id: UserId(rowid(&inserted)),
                username: user.username,
                email: user.email,
                password: user.password,
                role: user.role,
                phone: user.phone,
                first_name: user.first_name,
                last_name: user.last_name,
                created_at: user.created_at,
                last_login: None,
            })
        })
    }

    fn update_user(&self, user: User) -> Result<(), RepositoryError> {
        self.call(move |pool| async move {
            let updated = sqlx::query(
                "UPDATE users SET username = ?, email = ?, password = ?, role = ?, phone = ?,
                    first_name = ?, last_name = ?, last_login = ?
                 WHERE id = ?",
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.password.as_str())
            .bind(label(&user.role)?)
            .bind(&user.phone)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.last_login)
            .bind(key(user.id.0))
            .execute(&pool)
            .await?;
            if updated.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.call(move |pool| async move {
            sqlx::query("SELECT * FROM users WHERE id = ?")
                .bind(key(id.0))
                .fetch_optional(&pool)
                .await?
                .as_ref()
                .map(user_row)
                .transpose()
        })
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let username = username.to_string();
        self.call(move |pool| async move {
            sqlx::query("SELECT * FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&pool)
                .await?
                .as_ref()
                .map(user_row)
                .transpose()
        })
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let email = email.to_string();
        self.call(move |pool| async move {
            sqlx::query("SELECT * FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&pool)
                .await?
                .as_ref()
                .map(user_row)
                .transpose()
        })
    }

    fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, RepositoryError> {
        self.call(move |pool| async move {
            let rows = match role {
                Some(role) => {
                    sqlx::query("SELECT * FROM users WHERE role = ? ORDER BY id")
                        .bind(label(&role)?)
                        .fetch_all(&pool)
                        .await?
                }
                None => {
                    sqlx::query("SELECT * FROM users ORDER BY id")
                        .fetch_all(&pool)
                        .await?
                }
            };
            rows.iter().map(user_row).collect()
        })
    }

    fn count_users(&self) -> Result<usize, RepositoryError> {
        self.call(|pool| async move {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(&pool)
                .await?;
            Ok(count(total))
        })
    }

    fn fetch_student_profile(
        &self,
        user: UserId,
    ) -> Result<Option<StudentProfile>, RepositoryError> {
        self.call(move |pool| async move {
            sqlx::query("SELECT * FROM student_profiles WHERE user_id = ?")
                .bind(key(user.0))
                .fetch_optional(&pool)
                .await?
                .as_ref()
                .map(profile_row)
                .transpose()
        })
    }

    fn save_student_profile(&self, profile: StudentProfile) -> Result<(), RepositoryError> {
        self.call(move |pool| async move {
            let mut tx = pool.begin().await?;
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
                .bind(key(profile.user_id.0))
                .fetch_one(&mut *tx)
                .await?;
            if exists == 0 {
                return Err(RepositoryError::NotFound);
            }
            sqlx::query(
                "INSERT OR REPLACE INTO student_profiles (user_id, student_number,
                    date_of_birth, gender, id_number, address, emergency_contact_name,
                    emergency_contact_phone, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(key(profile.user_id.0))
            .bind(profile.student_number)
            .bind(profile.date_of_birth)
            .bind(profile.gender)
            .bind(profile.id_number)
            .bind(profile.address)
            .bind(profile.emergency_contact_name)
            .bind(profile.emergency_contact_phone)
            .bind(profile.updated_at)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(())
        })
    }

    fn delete_user(&self, id: UserId) -> Result<User, RepositoryError> {
        self.call(move |pool| async move {
            let mut tx = pool.begin().await?;
            let row = sqlx::query("SELECT * FROM users WHERE id = ?")
                .bind(key(id.0))
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            let user = user_row(&row)?;
            for statement in [
                "DELETE FROM student_profiles WHERE user_id = ?",
                "DELETE FROM notifications WHERE user_id = ?",
                "UPDATE accommodations SET admin_id = NULL WHERE admin_id = ?",
                "DELETE FROM users WHERE id = ?",
            ] {
                sqlx::query(statement)
                    .bind(key(id.0))
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
            Ok(user)
        })
    }
}

impl AccommodationRepository for SqliteHousingStore {
    fn insert_accommodation(
        &self,
        accommodation: NewAccommodation,
    ) -> Result<Accommodation, RepositoryError> {
        self.call(move |pool| async move {
            let inserted = sqlx::query(
                "INSERT INTO accommodations (name, location, description, rooms_available,
                    price_per_month, admin_id, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&accommodation.name)
            .bind(&accommodation.location)
            .bind(&accommodation.description)
            .bind(accommodation.rooms_available)
            .bind(accommodation.price_per_month.to_string())
            .bind(accommodation.admin_id.map(|id| key(id.0)))
            .bind(accommodation.created_at)
            .execute(&pool)
            .await?;
            Ok(Accommodation {
                id: AccommodationId(rowid(&inserted)),
                name: accommodation.name,
                location: accommodation.location,
                description: accommodation.description,
                rooms_available: accommodation.rooms_available,
                price_per_month: accommodation.price_per_month,
                admin_id: accommodation.admin_id,
                created_at: accommodation.created_at,
            })
        })
    }

    fn update_accommodation(&self, accommodation: Accommodation) -> Result<(), RepositoryError> {
        self.call(move |pool| async move {
            let updated = sqlx::query(
                "UPDATE accommodations SET name = ?, location = ?, description = ?,
                    rooms_available = ?, price_per_month = ?, admin_id = ?
                 WHERE id = ?",
            )
            .bind(accommodation.name)
            .bind(accommodation.location)
            .bind(accommodation.description)
            .bind(accommodation.rooms_available)
            .bind(accommodation.price_per_month.to_string())
            .bind(accommodation.admin_id.map(|id| key(id.0)))
            .bind(key(accommodation.id.0))
            .execute(&pool)
            .await?;
            if updated.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
    }

    fn fetch_accommodation(
        &self,
        id: AccommodationId,
    ) -> Result<Option<Accommodation>, RepositoryError> {
        self.call(move |pool| async move {
            sqlx::query("SELECT * FROM accommodations WHERE id = ?")
                .bind(key(id.0))
                .fetch_optional(&pool)
                .await?
                .as_ref()
                .map(accommodation_row)
                .transpose()
        })
    }

    fn list_accommodations(&self) -> Result<Vec<Accommodation>, RepositoryError> {
        self.call(|pool| async move {
            sqlx::query("SELECT * FROM accommodations ORDER BY id")
                .fetch_all(&pool)
                .await?
                .iter()
                .map(accommodation_row)
                .collect()
        })
    }

    fn delete_accommodation(
        &self,
        id: AccommodationId,
        today: NaiveDate,
    ) -> Result<Accommodation, RepositoryError> {
        self.call(move |pool| async move {
            let mut tx = pool.begin().await?;
            let row = sqlx::query("SELECT * FROM accommodations WHERE id = ?")
                .bind(key(id.0))
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            let accommodation = accommodation_row(&row)?;
            let occupied = leases_at(&mut *tx, id)
                .await?
                .iter()
                .any(|lease| lease.is_current(today));
            if occupied {
                return Err(RepositoryError::Conflict);
            }

            for statement in [
                "DELETE FROM invoices WHERE accommodation_id = ?",
                "DELETE FROM maintenance_requests WHERE accommodation_id = ?",
                "DELETE FROM leases WHERE accommodation_id = ?",
                "DELETE FROM applications WHERE accommodation_id = ?",
                "DELETE FROM accommodations WHERE id = ?",
            ] {
                sqlx::query(statement)
                    .bind(key(id.0))
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
            Ok(accommodation)
        })
    }
}

impl ApplicationRepository for SqliteHousingStore {
    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        self.call(move |pool| async move {
            let mut tx = pool.begin().await?;
            let duplicates: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM applications
                 WHERE user_id = ? AND accommodation_id = ? AND status != ?",
            )
            .bind(key(application.user_id.0))
            .bind(key(application.accommodation_id.0))
            .bind(label(&ApplicationStatus::Rejected)?)
            .fetch_one(&mut *tx)
            .await?;
            if duplicates > 0 {
                return Err(RepositoryError::Conflict);
            }

            let inserted = sqlx::query(
                "INSERT INTO applications (user_id, accommodation_id, status, move_in_date,
                    notes, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(key(application.user_id.0))
            .bind(key(application.accommodation_id.0))
            .bind(label(&ApplicationStatus::Pending)?)
            .bind(application.move_in_date)
            .bind(&application.notes)
            .bind(application.created_at)
            .bind(application.created_at)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(Application {
                id: ApplicationId(rowid(&inserted)),
                user_id: application.user_id,
                accommodation_id: application.accommodation_id,
                status: ApplicationStatus::Pending,
                move_in_date: application.move_in_date,
                notes: application.notes,
                created_at: application.created_at,
                updated_at: application.created_at,
            })
        })
    }

    fn fetch_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.call(move |pool| async move {
            sqlx::query("SELECT * FROM applications WHERE id = ?")
                .bind(key(id.0))
                .fetch_optional(&pool)
                .await?
                .as_ref()
                .map(application_row)
                .transpose()
        })
    }

    fn list_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        self.call(|pool| async move {
            sqlx::query("SELECT * FROM applications ORDER BY id")
                .fetch_all(&pool)
                .await?
                .iter()
                .map(application_row)
                .collect()
        })
    }

    fn transition_application(
        &self,
        id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        self.call(move |pool| async move {
            let mut tx = pool.begin().await?;
            let mut application = application_by_id(&mut *tx, id).await?;
            if application.status != from {
                return Err(RepositoryError::StaleState {
                    expected: from.label(),
                });
            }

            application.status = to;
            if notes.is_some() {
                application.notes = notes;
            }
            application.updated_at = at;
            sqlx::query("UPDATE applications SET status = ?, notes = ?, updated_at = ? WHERE id = ?")
                .bind(label(&application.status)?)
                .bind(&application.notes)
                .bind(application.updated_at)
                .bind(key(id.0))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(application)
        })
    }

    fn approve_application(
        &self,
        id: ApplicationId,
        notes: Option<String>,
        lease: NewLease,
    ) -> Result<(Application, Lease), RepositoryError> {
        self.call(move |pool| async move {
            let mut tx = pool.begin().await?;
            let mut application = application_by_id(&mut *tx, id).await?;
            if application.status != ApplicationStatus::Pending {
                return Err(RepositoryError::StaleState {
                    expected: ApplicationStatus::Pending.label(),
                });
            }

            let at = lease.created_at;
            let lease = push_lease(&mut *tx, lease).await?;
            application.status = ApplicationStatus::Approved;
            if notes.is_some() {
                application.notes = notes;
            }
            application.updated_at = at;
            sqlx::query("UPDATE applications SET status = ?, notes = ?, updated_at = ? WHERE id = ?")
                .bind(label(&application.status)?)
                .bind(&application.notes)
                .bind(application.updated_at)
                .bind(key(id.0))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok((application, lease))
        })
    }
}

impl LeaseRepository for SqliteHousingStore {
    fn insert_lease(&self, lease: NewLease) -> Result<Lease, RepositoryError> {
        self.call(move |pool| async move {
            let mut tx = pool.begin().await?;
            let lease = push_lease(&mut *tx, lease).await?;
            tx.commit().await?;
            Ok(lease)
        })
    }

    fn fetch_lease(&self, id: LeaseId) -> Result<Option<Lease>, RepositoryError> {
        self.call(move |pool| async move {
            sqlx::query("SELECT * FROM leases WHERE id = ?")
                .bind(key(id.0))
                .fetch_optional(&pool)
                .await?
                .as_ref()
                .map(lease_row)
                .transpose()
        })
    }

    fn list_leases(&self) -> Result<Vec<Lease>, RepositoryError> {
        self.call(|pool| async move {
            sqlx::query("SELECT * FROM leases ORDER BY id")
                .fetch_all(&pool)
                .await?
                .iter()
                .map(lease_row)
                .collect()
        })
    }

    fn mark_lease_signed(
        &self,
        id: LeaseId,
        signed_at: DateTime<Utc>,
    ) -> Result<Lease, RepositoryError> {
        self.call(move |pool| async move {
            let mut tx = pool.begin().await?;
            let mut lease = lease_by_id(&mut *tx, id).await?;
            if lease.signed {
                return Err(RepositoryError::StaleState {
                    expected: "unsigned",
                });
            }
            lease.signed = true;
            lease.signed_at = Some(signed_at);
            sqlx::query("UPDATE leases SET signed = 1, signed_at = ? WHERE id = ?")
                .bind(signed_at)
                .bind(key(id.0))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(lease)
        })
    }

    fn terminate_lease(&self, id: LeaseId, on: NaiveDate) -> Result<Lease, RepositoryError> {
        self.call(move |pool| async move {
            let mut tx = pool.begin().await?;
            let mut lease = lease_by_id(&mut *tx, id).await?;
            if lease.terminated_on.is_some() {
                return Err(RepositoryError::StaleState {
                    expected: "in force",
                });
            }
            lease.end_date = on;
            lease.terminated_on = Some(on);
            sqlx::query("UPDATE leases SET end_date = ?, terminated_on = ? WHERE id = ?")
                .bind(on)
                .bind(on)
                .bind(key(id.0))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(lease)
        })
    }
}

impl InvoiceRepository for SqliteHousingStore {
    fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, RepositoryError> {
        self.call(move |pool| async move {
            let inserted = sqlx::query(
                "INSERT INTO invoices (user_id, accommodation_id, lease_id, amount, late_fee,
                    period_start, period_end, due_date, paid, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
            )
            .bind(key(invoice.user_id.0))
            .bind(key(invoice.accommodation_id.0))
            .bind(key(invoice.lease_id.0))
            .bind(invoice.amount.to_string())
            .bind(invoice.late_fee.to_string())
            .bind(invoice.period_start)
            .bind(invoice.period_end)
            .bind(invoice.due_date)
            .bind(invoice.created_at)
            .execute(&pool)
            .await?;
            Ok(Invoice {
                id: InvoiceId(rowid(&inserted)),
                user_id: invoice.user_id,
                accommodation_id: invoice.accommodation_id,
                lease_id: invoice.lease_id,
                amount: invoice.amount,
                late_fee: invoice.late_fee,
                period_start: invoice.period_start,
                period_end: invoice.period_end,
                due_date: invoice.due_date,
                paid: false,
                paid_at: None,
                payment_method: None,
                reference_number: None,
                created_at: invoice.created_at,
            })
        })
    }

    fn fetch_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        self.call(move |pool| async move {
            sqlx::query("SELECT * FROM invoices WHERE id = ?")
                .bind(key(id.0))
                .fetch_optional(&pool)
                .await?
                .as_ref()
                .map(invoice_row)
                .transpose()
        })
    }

    fn list_invoices(&self) -> Result<Vec<Invoice>, RepositoryError> {
        self.call(|pool| async move {
            sqlx::query("SELECT * FROM invoices ORDER BY id")
                .fetch_all(&pool)
                .await?
                .iter()
                .map(invoice_row)
                .collect()
        })
    }

    fn mark_invoice_paid(
        &self,
        id: InvoiceId,
        payment: PaymentRecord,
    ) -> Result<Invoice, RepositoryError> {
        self.call(move |pool| async move {
            let mut tx = pool.begin().await?;
            let row = sqlx::query("SELECT * FROM invoices WHERE id = ?")
                .bind(key(id.0))
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            let mut invoice = invoice_row(&row)?;
            if invoice.paid {
                return Err(RepositoryError::StaleState { expected: "unpaid" });
            }
            invoice.paid = true;
            invoice.paid_at = Some(payment.paid_at);
            invoice.payment_method = Some(payment.payment_method);
            invoice.reference_number = payment.reference_number;
            sqlx::query(
                "UPDATE invoices SET paid = 1, paid_at = ?, payment_method = ?,
                    reference_number = ?
                 WHERE id = ?",
            )
            .bind(invoice.paid_at)
            .bind(&invoice.payment_method)
            .bind(&invoice.reference_number)
            .bind(key(id.0))
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(invoice)
        })
    }
}

impl MaintenanceRepository for SqliteHousingStore {
    fn insert_maintenance_request(
        &self,
        request: NewMaintenanceRequest,
    ) -> Result<MaintenanceRequest, RepositoryError> {
        self.call(move |pool| async move {
            let inserted = sqlx::query(
                "INSERT INTO maintenance_requests (user_id, accommodation_id, issue,
                    description, priority, status, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(key(request.user_id.0))
            .bind(key(request.accommodation_id.0))
            .bind(&request.issue)
            .bind(&request.description)
            .bind(label(&request.priority)?)
            .bind(label(&MaintenanceStatus::Pending)?)
            .bind(request.created_at)
            .bind(request.created_at)
            .execute(&pool)
            .await?;
            Ok(MaintenanceRequest {
                id: MaintenanceId(rowid(&inserted)),
                user_id: request.user_id,
                accommodation_id: request.accommodation_id,
                issue: request.issue,
                description: request.description,
                priority: request.priority,
                status: MaintenanceStatus::Pending,
                notes: None,
                created_at: request.created_at,
                updated_at: request.created_at,
                completed_at: None,
            })
        })
    }

    fn fetch_maintenance_request(
        &self,
        id: MaintenanceId,
    ) -> Result<Option<MaintenanceRequest>, RepositoryError> {
        self.call(move |pool| async move {
            sqlx::query("SELECT * FROM maintenance_requests WHERE id = ?")
                .bind(key(id.0))
                .fetch_optional(&pool)
                .await?
                .as_ref()
                .map(maintenance_row)
                .transpose()
        })
    }

    fn list_maintenance_requests(&self) -> Result<Vec<MaintenanceRequest>, RepositoryError> {
        self.call(|pool| async move {
            sqlx::query("SELECT * FROM maintenance_requests ORDER BY id")
                .fetch_all(&pool)
                .await?
                .iter()
                .map(maintenance_row)
                .collect()
        })
    }

    fn update_maintenance_status(
        &self,
        id: MaintenanceId,
        change: StatusChange,
    ) -> Result<MaintenanceRequest, RepositoryError> {
        self.call(move |pool| async move {
            let mut tx = pool.begin().await?;
            let row = sqlx::query("SELECT * FROM maintenance_requests WHERE id = ?")
                .bind(key(id.0))
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            let mut request = maintenance_row(&row)?;
            if request.status.is_terminal() {
                return Err(RepositoryError::StaleState { expected: "open" });
            }

            request.status = change.status;
            if change.notes.is_some() {
                request.notes = change.notes;
            }
            request.updated_at = change.at;
            if change.status == MaintenanceStatus::Completed {
                request.completed_at = Some(change.at);
            }
            sqlx::query(
                "UPDATE maintenance_requests SET status = ?, notes = ?, updated_at = ?,
                    completed_at = ?
                 WHERE id = ?",
            )
            .bind(label(&request.status)?)
            .bind(&request.notes)
            .bind(request.updated_at)
            .bind(request.completed_at)
            .bind(key(id.0))
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(request)
        })
    }
}

impl NotificationRepository for SqliteHousingStore {
    fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError> {
        self.call(move |pool| async move {
            let inserted = sqlx::query(
                "INSERT INTO notifications (user_id, subject, message, kind, is_read, created_at)
                 VALUES (?, ?, ?, ?, 0, ?)",
            )
            .bind(key(notification.user_id.0))
            .bind(&notification.subject)
            .bind(&notification.message)
            .bind(label(&notification.kind)?)
            .bind(notification.created_at)
            .execute(&pool)
            .await?;
            Ok(Notification {
                id: NotificationId(rowid(&inserted)),
                user_id: notification.user_id,
                subject: notification.subject,
                message: notification.message,
                kind: notification.kind,
                is_read: false,
                created_at: notification.created_at,
            })
        })
    }

    fn notifications_for_user(
        &self,
        user: UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError> {
        self.call(move |pool| async move {
            let mut inbox = sqlx::query(
                "SELECT * FROM notifications WHERE user_id = ? AND (is_read = 0 OR ? = 0)",
            )
            .bind(key(user.0))
            .bind(unread_only)
            .fetch_all(&pool)
            .await?
            .iter()
            .map(notification_row)
            .collect::<Result<Vec<_>, _>>()?;
            inbox.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(inbox)
        })
    }

    fn mark_notification_read(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<Notification, RepositoryError> {
        self.call(move |pool| async move {
            let mut tx = pool.begin().await?;
            let row = sqlx::query("SELECT * FROM notifications WHERE id = ? AND user_id = ?")
                .bind(key(id.0))
                .bind(key(user.0))
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            let mut notification = notification_row(&row)?;
            notification.is_read = true;
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
                .bind(key(id.0))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(notification)
        })
    }

    fn mark_all_notifications_read(&self, user: UserId) -> Result<usize, RepositoryError> {
        self.call(move |pool| async move {
            let updated =
                sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
                    .bind(key(user.0))
                    .execute(&pool)
                    .await?;
            Ok(usize::try_from(updated.rows_affected()).unwrap_or_default())
        })
    }

    fn count_unread_notifications(&self, user: UserId) -> Result<usize, RepositoryError> {
        self.call(move |pool| async move {
            let unread: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
            )
            .bind(key(user.0))
            .fetch_one(&pool)
            .await?;
            Ok(count(unread))
        })
    }
}
