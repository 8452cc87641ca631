use super::Repository;
use crate::error::{AppError, Result};
use crate::models::{
    AdminDashboardStats, Application, ApplicationFilter, ApplicationStatus, NewApplication,
    NewReview, NewScholarship, NewUser, PaidTransition, Review, ReviewFilter, Role, Scholarship,
    ScholarshipSearch, ScholarshipSort, UpdateReviewRequest, UpdateScholarshipRequest, User,
    UserFilter, normalize_email,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, name, photo_url, role, created_at";

const SCHOLARSHIP_COLUMNS: &str = "id, name, university, university_image, country, city, \
     world_rank, subject_category, scholarship_category, degree, tuition_fees, \
     application_fees, service_charge, application_deadline, posted_by, created_at";

const APPLICATION_COLUMNS: &str = "id, scholarship_id, user_email, user_name, \
     scholarship_name, university_name, degree, application_fees, service_charge, status, \
     payment_status, feedback, transaction_id, created_at, paid_at";

const REVIEW_COLUMNS: &str = "id, application_id, scholarship_id, scholarship_name, \
     university_name, user_email, user_name, user_image, rating, comment, created_at";

/// Turns free text into an ILIKE substring pattern with the wildcards escaped.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Appends the search filters shared by the page query and the count query.
fn push_scholarship_filters(builder: &mut QueryBuilder<'_, Postgres>, search: &ScholarshipSearch) {
    if let Some(text) = &search.text {
        let pattern = like_pattern(text);
        builder.push(" AND (name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR university ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR degree ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(country) = &search.country {
        builder.push(" AND LOWER(country) = LOWER(");
        builder.push_bind(country.clone());
        builder.push(")");
    }
    if let Some(category) = &search.category {
        builder.push(" AND LOWER(scholarship_category) = LOWER(");
        builder.push_bind(category.clone());
        builder.push(")");
    }
    if let Some(degree) = &search.degree {
        builder.push(" AND LOWER(degree) = LOWER(");
        builder.push_bind(degree.clone());
        builder.push(")");
    }
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Uniqueness (user email,
/// review per application, transaction id) is enforced by the schema in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    /// create_user
    ///
    /// `ON CONFLICT (email) DO NOTHING` makes a repeated sign-in a no-op.
    async fn create_user(&self, user: NewUser) -> Result<Option<User>> {
        let query = format!(
            "INSERT INTO users (id, email, name, photo_url, role, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) \
             ON CONFLICT (email) DO NOTHING \
             RETURNING {USER_COLUMNS}"
        );
        let created = sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(normalize_email(&user.email))
            .bind(user.name)
            .bind(user.photo_url)
            .bind(Role::Student)
            .fetch_optional(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));

        if let Some(role) = filter.role {
            builder.push(" AND role = ");
            builder.push_bind(role);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search.trim());
            builder.push(" AND (email ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR name ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>> {
        let query = format!("UPDATE users SET role = $1 WHERE id = $2 RETURNING {USER_COLUMNS}");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(role)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- SCHOLARSHIPS ---

    async fn create_scholarship(&self, scholarship: NewScholarship) -> Result<Scholarship> {
        let req = scholarship.request;
        let query = format!(
            "INSERT INTO scholarships (id, name, university, university_image, country, city, \
             world_rank, subject_category, scholarship_category, degree, tuition_fees, \
             application_fees, service_charge, application_deadline, posted_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, NOW()) \
             RETURNING {SCHOLARSHIP_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Scholarship>(&query)
            .bind(Uuid::new_v4())
            .bind(req.name)
            .bind(req.university)
            .bind(req.university_image)
            .bind(req.country)
            .bind(req.city)
            .bind(req.world_rank)
            .bind(req.subject_category)
            .bind(req.scholarship_category)
            .bind(req.degree)
            .bind(req.tuition_fees)
            .bind(req.application_fees)
            .bind(req.service_charge)
            .bind(req.application_deadline)
            .bind(scholarship.posted_by)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_scholarship(&self, id: Uuid) -> Result<Option<Scholarship>> {
        let query = format!("SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships WHERE id = $1");
        Ok(sqlx::query_as::<_, Scholarship>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_scholarships(&self) -> Result<Vec<Scholarship>> {
        let query =
            format!("SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships ORDER BY created_at DESC");
        Ok(sqlx::query_as::<_, Scholarship>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    /// search_scholarships
    ///
    /// Builds the page query and the count query from the same filter set with
    /// QueryBuilder, so every user-supplied value is a bound parameter.
    async fn search_scholarships(
        &self,
        search: &ScholarshipSearch,
    ) -> Result<(Vec<Scholarship>, i64)> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM scholarships WHERE TRUE");
        push_scholarship_filters(&mut count, search);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut page: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships WHERE TRUE"
        ));
        push_scholarship_filters(&mut page, search);
        page.push(match search.sort {
            ScholarshipSort::FeeLow => " ORDER BY application_fees ASC, created_at DESC",
            ScholarshipSort::FeeHigh => " ORDER BY application_fees DESC, created_at DESC",
            ScholarshipSort::Recent => " ORDER BY created_at DESC",
        });
        page.push(" LIMIT ");
        page.push_bind(search.limit);
        page.push(" OFFSET ");
        page.push_bind(search.offset());

        let scholarships = page
            .build_query_as::<Scholarship>()
            .fetch_all(&self.pool)
            .await?;

        Ok((scholarships, total))
    }

    /// update_scholarship
    ///
    /// COALESCE keeps every column whose field in `changes` is `None`.
    async fn update_scholarship(
        &self,
        id: Uuid,
        changes: UpdateScholarshipRequest,
    ) -> Result<Option<Scholarship>> {
        let query = format!(
            "UPDATE scholarships SET \
                name = COALESCE($2, name), \
                university = COALESCE($3, university), \
                university_image = COALESCE($4, university_image), \
                country = COALESCE($5, country), \
                city = COALESCE($6, city), \
                world_rank = COALESCE($7, world_rank), \
                subject_category = COALESCE($8, subject_category), \
                scholarship_category = COALESCE($9, scholarship_category), \
                degree = COALESCE($10, degree), \
                tuition_fees = COALESCE($11, tuition_fees), \
                application_fees = COALESCE($12, application_fees), \
                service_charge = COALESCE($13, service_charge), \
                application_deadline = COALESCE($14, application_deadline) \
             WHERE id = $1 \
             RETURNING {SCHOLARSHIP_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Scholarship>(&query)
            .bind(id)
            .bind(changes.name)
            .bind(changes.university)
            .bind(changes.university_image)
            .bind(changes.country)
            .bind(changes.city)
            .bind(changes.world_rank)
            .bind(changes.subject_category)
            .bind(changes.scholarship_category)
            .bind(changes.degree)
            .bind(changes.tuition_fees)
            .bind(changes.application_fees)
            .bind(changes.service_charge)
            .bind(changes.application_deadline)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_scholarship(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM scholarships WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- APPLICATIONS ---

    async fn create_application(&self, application: NewApplication) -> Result<Application> {
        let query = format!(
            "INSERT INTO applications (id, scholarship_id, user_email, user_name, \
             scholarship_name, university_name, degree, application_fees, service_charge, \
             status, payment_status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', 'unpaid', NOW()) \
             RETURNING {APPLICATION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Application>(&query)
            .bind(Uuid::new_v4())
            .bind(application.scholarship_id)
            .bind(application.user_email)
            .bind(application.user_name)
            .bind(application.scholarship_name)
            .bind(application.university_name)
            .bind(application.degree)
            .bind(application.application_fees)
            .bind(application.service_charge)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>> {
        let query = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1");
        Ok(sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_application_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Application>> {
        let query =
            format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE transaction_id = $1");
        Ok(sqlx::query_as::<_, Application>(&query)
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE TRUE"
        ));
        if let Some(email) = &filter.user_email {
            builder.push(" AND user_email = ");
            builder.push_bind(email.clone());
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        if let Some(payment_status) = filter.payment_status {
            builder.push(" AND payment_status = ");
            builder.push_bind(payment_status);
        }
        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<Application>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn set_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<Application>> {
        let query = format!(
            "UPDATE applications SET status = $1 WHERE id = $2 RETURNING {APPLICATION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Application>(&query)
            .bind(status)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_application_feedback(
        &self,
        id: Uuid,
        feedback: String,
    ) -> Result<Option<Application>> {
        let query = format!(
            "UPDATE applications SET feedback = $1 WHERE id = $2 RETURNING {APPLICATION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Application>(&query)
            .bind(feedback)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// mark_application_paid
    ///
    /// A single conditional UPDATE: only the caller that observes `unpaid` wins. The
    /// partial unique index on `transaction_id` rejects a transaction recorded twice.
    async fn mark_application_paid(
        &self,
        id: Uuid,
        transaction_id: &str,
    ) -> Result<Option<PaidTransition>> {
        let query = format!(
            "UPDATE applications \
             SET payment_status = 'paid', transaction_id = $2, paid_at = NOW() \
             WHERE id = $1 AND payment_status = 'unpaid' \
             RETURNING {APPLICATION_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db) = &e {
                    if db.is_unique_violation() {
                        return AppError::Conflict(
                            "transaction already recorded for another application".to_string(),
                        );
                    }
                }
                AppError::Database(e)
            })?;

        if let Some(application) = updated {
            return Ok(Some(PaidTransition::Applied(application)));
        }
        Ok(self
            .find_application(id)
            .await?
            .map(PaidTransition::AlreadyPaid))
    }

    async fn delete_application(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- REVIEWS ---

    /// create_review
    ///
    /// The UNIQUE constraint on `application_id` turns a second review into a no-op.
    async fn create_review(&self, review: NewReview) -> Result<Option<Review>> {
        let query = format!(
            "INSERT INTO reviews (id, application_id, scholarship_id, scholarship_name, \
             university_name, user_email, user_name, user_image, rating, comment, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW()) \
             ON CONFLICT (application_id) DO NOTHING \
             RETURNING {REVIEW_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Review>(&query)
            .bind(Uuid::new_v4())
            .bind(review.application_id)
            .bind(review.scholarship_id)
            .bind(review.scholarship_name)
            .bind(review.university_name)
            .bind(review.user_email)
            .bind(review.user_name)
            .bind(review.user_image)
            .bind(review.rating)
            .bind(review.comment)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>> {
        let query = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        Ok(sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_review_by_application(&self, application_id: Uuid) -> Result<Option<Review>> {
        let query = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE application_id = $1");
        Ok(sqlx::query_as::<_, Review>(&query)
            .bind(application_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE TRUE"));
        if let Some(email) = &filter.user_email {
            builder.push(" AND user_email = ");
            builder.push_bind(email.clone());
        }
        if let Some(scholarship_id) = filter.scholarship_id {
            builder.push(" AND scholarship_id = ");
            builder.push_bind(scholarship_id);
        }
        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<Review>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_review(
        &self,
        id: Uuid,
        changes: UpdateReviewRequest,
    ) -> Result<Option<Review>> {
        let query = format!(
            "UPDATE reviews SET rating = COALESCE($2, rating), comment = COALESCE($3, comment) \
             WHERE id = $1 RETURNING {REVIEW_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .bind(changes.rating)
            .bind(changes.comment)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- DASHBOARD ---

    /// get_stats
    ///
    /// Compiles every dashboard counter in a single round trip.
    async fn get_stats(&self) -> Result<AdminDashboardStats> {
        Ok(sqlx::query_as::<_, AdminDashboardStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM scholarships) AS total_scholarships,
                (SELECT COUNT(*) FROM applications) AS total_applications,
                (SELECT COUNT(*) FROM applications WHERE status = 'pending') AS pending_applications,
                (SELECT COUNT(*) FROM reviews) AS total_reviews,
                (SELECT COALESCE(SUM(application_fees + service_charge), 0)::DOUBLE PRECISION
                    FROM applications WHERE payment_status = 'paid') AS fees_collected
            "#,
        )
        .fetch_one(&self.pool)
        .await?)
    }
}
