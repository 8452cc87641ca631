use super::Repository;
use crate::error::{AppError, Result};
use crate::models::{
    AdminDashboardStats, Application, ApplicationFilter, ApplicationStatus, NewApplication,
    NewReview, NewScholarship, NewUser, PaidTransition, PaymentStatus, Review, ReviewFilter, Role,
    Scholarship, ScholarshipSearch, ScholarshipSort, UpdateReviewRequest,
    UpdateScholarshipRequest, User, UserFilter, normalize_email,
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    scholarships: Vec<Scholarship>,
    applications: Vec<Application>,
    reviews: Vec<Review>,
}

/// InMemoryRepository
///
/// A `Repository` held entirely in process memory. It applies the same uniqueness
/// rules and the same conditional paid transition as the Postgres schema, under one
/// lock, so handler and workflow tests run without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_scholarship(s: &Scholarship, search: &ScholarshipSearch) -> bool {
    let text_ok = search.text.as_deref().is_none_or(|t| {
        contains_ci(&s.name, t) || contains_ci(&s.university, t) || contains_ci(&s.degree, t)
    });
    let country_ok = search
        .country
        .as_deref()
        .is_none_or(|c| s.country.eq_ignore_ascii_case(c));
    let category_ok = search.category.as_deref().is_none_or(|c| {
        s.scholarship_category
            .as_deref()
            .is_some_and(|sc| sc.eq_ignore_ascii_case(c))
    });
    let degree_ok = search
        .degree
        .as_deref()
        .is_none_or(|d| s.degree.eq_ignore_ascii_case(d));
    text_ok && country_ok && category_ok && degree_ok
}

/// Newest first; among equal timestamps the later insert wins.
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    out
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<Option<User>> {
        let email = normalize_email(&user.email);
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == email) {
            return Ok(None);
        }
        let created = User {
            id: Uuid::new_v4(),
            email,
            name: user.name,
            photo_url: user.photo_url,
            role: Role::Student,
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(Some(created))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let matching: Vec<User> = tables
            .users
            .iter()
            .filter(|u| filter.role.is_none_or(|r| u.role == r))
            .filter(|u| {
                search.is_none_or(|s| {
                    contains_ci(&u.email, s)
                        || u.name.as_deref().is_some_and(|n| contains_ci(n, s))
                })
            })
            .cloned()
            .collect();
        Ok(newest_first(&matching, |u| u.created_at))
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.role = role;
            u.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        Ok(tables.users.len() < before)
    }

    async fn create_scholarship(&self, scholarship: NewScholarship) -> Result<Scholarship> {
        let req = scholarship.request;
        let created = Scholarship {
            id: Uuid::new_v4(),
            name: req.name,
            university: req.university,
            university_image: req.university_image,
            country: req.country,
            city: req.city,
            world_rank: req.world_rank,
            subject_category: req.subject_category,
            scholarship_category: req.scholarship_category,
            degree: req.degree,
            tuition_fees: req.tuition_fees,
            application_fees: req.application_fees,
            service_charge: req.service_charge,
            application_deadline: req.application_deadline,
            posted_by: scholarship.posted_by,
            created_at: Utc::now(),
        };
        self.tables.write().await.scholarships.push(created.clone());
        Ok(created)
    }

    async fn find_scholarship(&self, id: Uuid) -> Result<Option<Scholarship>> {
        let tables = self.tables.read().await;
        Ok(tables.scholarships.iter().find(|s| s.id == id).cloned())
    }

    async fn list_scholarships(&self) -> Result<Vec<Scholarship>> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.scholarships, |s| s.created_at))
    }

    async fn search_scholarships(
        &self,
        search: &ScholarshipSearch,
    ) -> Result<(Vec<Scholarship>, i64)> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Scholarship> = newest_first(&tables.scholarships, |s| s.created_at)
            .into_iter()
            .filter(|s| matches_scholarship(s, search))
            .collect();

        // Stable sorts keep newest-first among equal fees.
        match search.sort {
            ScholarshipSort::FeeLow => {
                matching.sort_by(|a, b| a.application_fees.total_cmp(&b.application_fees))
            }
            ScholarshipSort::FeeHigh => {
                matching.sort_by(|a, b| b.application_fees.total_cmp(&a.application_fees))
            }
            ScholarshipSort::Recent => {}
        }

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(search.offset() as usize)
            .take(search.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_scholarship(
        &self,
        id: Uuid,
        changes: UpdateScholarshipRequest,
    ) -> Result<Option<Scholarship>> {
        let mut tables = self.tables.write().await;
        let Some(s) = tables.scholarships.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.name {
            s.name = v;
        }
        if let Some(v) = changes.university {
            s.university = v;
        }
        if let Some(v) = changes.university_image {
            s.university_image = Some(v);
        }
        if let Some(v) = changes.country {
            s.country = v;
        }
        if let Some(v) = changes.city {
            s.city = Some(v);
        }
        if let Some(v) = changes.world_rank {
            s.world_rank = Some(v);
        }
        if let Some(v) = changes.subject_category {
            s.subject_category = Some(v);
        }
        if let Some(v) = changes.scholarship_category {
            s.scholarship_category = Some(v);
        }
        if let Some(v) = changes.degree {
            s.degree = v;
        }
        if let Some(v) = changes.tuition_fees {
            s.tuition_fees = Some(v);
        }
        if let Some(v) = changes.application_fees {
            s.application_fees = v;
        }
        if let Some(v) = changes.service_charge {
            s.service_charge = v;
        }
        if let Some(v) = changes.application_deadline {
            s.application_deadline = Some(v);
        }
        Ok(Some(s.clone()))
    }

    async fn delete_scholarship(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.scholarships.len();
        tables.scholarships.retain(|s| s.id != id);
        Ok(tables.scholarships.len() < before)
    }

    async fn create_application(&self, application: NewApplication) -> Result<Application> {
        let created = Application {
            id: Uuid::new_v4(),
            scholarship_id: application.scholarship_id,
            user_email: application.user_email,
            user_name: application.user_name,
            scholarship_name: application.scholarship_name,
            university_name: application.university_name,
            degree: application.degree,
            application_fees: application.application_fees,
            service_charge: application.service_charge,
            status: ApplicationStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            feedback: None,
            transaction_id: None,
            created_at: Utc::now(),
            paid_at: None,
        };
        self.tables.write().await.applications.push(created.clone());
        Ok(created)
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>> {
        let tables = self.tables.read().await;
        Ok(tables.applications.iter().find(|a| a.id == id).cloned())
    }

    async fn find_application_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Application>> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .iter()
            .find(|a| a.transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>> {
        let tables = self.tables.read().await;
        let matching: Vec<Application> = tables
            .applications
            .iter()
            .filter(|a| {
                filter
                    .user_email
                    .as_deref()
                    .is_none_or(|e| a.user_email == e)
            })
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .filter(|a| filter.payment_status.is_none_or(|p| a.payment_status == p))
            .cloned()
            .collect();
        Ok(newest_first(&matching, |a| a.created_at))
    }

    async fn set_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<Application>> {
        let mut tables = self.tables.write().await;
        Ok(tables.applications.iter_mut().find(|a| a.id == id).map(|a| {
            a.status = status;
            a.clone()
        }))
    }

    async fn set_application_feedback(
        &self,
        id: Uuid,
        feedback: String,
    ) -> Result<Option<Application>> {
        let mut tables = self.tables.write().await;
        Ok(tables.applications.iter_mut().find(|a| a.id == id).map(|a| {
            a.feedback = Some(feedback);
            a.clone()
        }))
    }

    async fn mark_application_paid(
        &self,
        id: Uuid,
        transaction_id: &str,
    ) -> Result<Option<PaidTransition>> {
        let mut tables = self.tables.write().await;
        if tables
            .applications
            .iter()
            .any(|a| a.id != id && a.transaction_id.as_deref() == Some(transaction_id))
        {
            return Err(AppError::Conflict(
                "transaction already recorded for another application".to_string(),
            ));
        }
        let Some(application) = tables.applications.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if application.payment_status == PaymentStatus::Paid {
            return Ok(Some(PaidTransition::AlreadyPaid(application.clone())));
        }
        application.payment_status = PaymentStatus::Paid;
        application.transaction_id = Some(transaction_id.to_string());
        application.paid_at = Some(Utc::now());
        Ok(Some(PaidTransition::Applied(application.clone())))
    }

    async fn delete_application(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.applications.len();
        tables.applications.retain(|a| a.id != id);
        Ok(tables.applications.len() < before)
    }

    async fn create_review(&self, review: NewReview) -> Result<Option<Review>> {
        let mut tables = self.tables.write().await;
        if tables
            .reviews
            .iter()
            .any(|r| r.application_id == review.application_id)
        {
            return Ok(None);
        }
        let created = Review {
            id: Uuid::new_v4(),
            application_id: review.application_id,
            scholarship_id: review.scholarship_id,
            scholarship_name: review.scholarship_name,
            university_name: review.university_name,
            user_email: review.user_email,
            user_name: review.user_name,
            user_image: review.user_image,
            rating: review.rating,
            comment: review.comment,
            created_at: Utc::now(),
        };
        tables.reviews.push(created.clone());
        Ok(Some(created))
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn find_review_by_application(&self, application_id: Uuid) -> Result<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .iter()
            .find(|r| r.application_id == application_id)
            .cloned())
    }

    async fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>> {
        let tables = self.tables.read().await;
        let matching: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| {
                filter
                    .user_email
                    .as_deref()
                    .is_none_or(|e| r.user_email == e)
            })
            .filter(|r| filter.scholarship_id.is_none_or(|s| r.scholarship_id == s))
            .cloned()
            .collect();
        Ok(newest_first(&matching, |r| r.created_at))
    }

    async fn update_review(
        &self,
        id: Uuid,
        changes: UpdateReviewRequest,
    ) -> Result<Option<Review>> {
        let mut tables = self.tables.write().await;
        Ok(tables.reviews.iter_mut().find(|r| r.id == id).map(|r| {
            if let Some(rating) = changes.rating {
                r.rating = rating;
            }
            if let Some(comment) = changes.comment {
                r.comment = comment;
            }
            r.clone()
        }))
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.reviews.len();
        tables.reviews.retain(|r| r.id != id);
        Ok(tables.reviews.len() < before)
    }

    async fn get_stats(&self) -> Result<AdminDashboardStats> {
        let tables = self.tables.read().await;
        let paid = tables
            .applications
            .iter()
            .filter(|a| a.payment_status == PaymentStatus::Paid);
        Ok(AdminDashboardStats {
            total_users: tables.users.len() as i64,
            total_scholarships: tables.scholarships.len() as i64,
            total_applications: tables.applications.len() as i64,
            pending_applications: tables
                .applications
                .iter()
                .filter(|a| a.status == ApplicationStatus::Pending)
                .count() as i64,
            total_reviews: tables.reviews.len() as i64,
            fees_collected: paid.map(Application::amount_due).sum(),
        })
    }
}
