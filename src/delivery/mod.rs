//! Certificate rendering and email delivery.
//!
//! Rendering, QR encoding and mail transport are ports; this module owns the
//! order they run in and the certificate status each outcome leaves behind.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::store::{CertificateStore, StoreError};
use crate::student::model::{CertificateStatus, StudentRecord};
use crate::verification::VerificationComposer;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("QR code generation failed: {0}")]
    Qr(String),
    #[error("certificate rendering failed: {0}")]
    Render(String),
    #[error("email delivery failed: {0}")]
    Email(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait QrEncoder: Send + Sync {
    /// Encode `payload` into an image and return where it was written.
    async fn encode(&self, payload: &str, certificate_id: &str) -> Result<PathBuf, DeliveryError>;
}

#[async_trait]
pub trait CertificateRenderer: Send + Sync {
    async fn render(
        &self,
        student: &StudentRecord,
        background: &Path,
        qr_code: Option<&Path>,
    ) -> Result<PathBuf, DeliveryError>;
}

#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachment: Option<EmailAttachment>,
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn compose_certificate_email(
    student: &StudentRecord,
    certificate_pdf: Option<&Path>,
    composer: &VerificationComposer,
) -> EmailMessage {
    let mut details = vec![
        format!("<li><strong>Program:</strong> {}</li>", escape_html(&student.internship_name)),
        format!(
            "<li><strong>Duration:</strong> {} to {}</li>",
            student.internship_start_date.format("%B %d, %Y"),
            student.internship_end_date.format("%B %d, %Y")
        ),
        format!("<li><strong>Certificate ID:</strong> {}</li>", escape_html(&student.certificate_id)),
        format!("<li><strong>College:</strong> {}</li>", escape_html(&student.college_name)),
        format!("<li><strong>Branch:</strong> {}</li>", escape_html(&student.branch)),
    ];
    let optional = [
        ("Mentor", &student.mentor_name),
        ("Company", &student.company_name),
        ("Performance Rating", &student.performance_rating),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            details.push(format!("<li><strong>{}:</strong> {}</li>", label, escape_html(value)));
        }
    }

    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>Internship Certificate</title></head>
<body>
<h1>Congratulations!</h1>
<p>Dear <strong>{name}</strong>,</p>
<p>Congratulations on successfully completing your internship program. Your certificate is attached to this email.</p>
<h3>Internship Details:</h3>
<ul>
{details}
</ul>
<p>You can verify your certificate online using the certificate ID <strong>{id}</strong>.</p>
<p><a href="{view_url}">Verify Certificate Online</a></p>
<p>This is an automated email. Please do not reply to this message.</p>
</body>
</html>
"#,
        name = escape_html(&student.student_name),
        details = details.join("\n"),
        id = escape_html(&student.certificate_id),
        view_url = composer.view_url(&student.certificate_id),
    );

    EmailMessage {
        to: student.email.clone(),
        subject: format!("Internship Certificate - {}", student.internship_name),
        html_body,
        attachment: certificate_pdf.map(|path| EmailAttachment {
            filename: format!("certificate_{}.pdf", student.certificate_id),
            content_type: "application/pdf".to_string(),
            path: path.to_path_buf(),
        }),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliverySummary {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct CertificateDelivery {
    store: Arc<dyn CertificateStore>,
    renderer: Arc<dyn CertificateRenderer>,
    qr: Arc<dyn QrEncoder>,
    mailer: Arc<dyn EmailDispatcher>,
    composer: VerificationComposer,
    background: PathBuf,
}

impl CertificateDelivery {
    pub fn new(
        store: Arc<dyn CertificateStore>,
        renderer: Arc<dyn CertificateRenderer>,
        qr: Arc<dyn QrEncoder>,
        mailer: Arc<dyn EmailDispatcher>,
        composer: VerificationComposer,
        background: PathBuf,
    ) -> Self {
        Self {
            store,
            renderer,
            qr,
            mailer,
            composer,
            background,
        }
    }

    /// Render and mail one certificate, returning the status it ends in.
    ///
    /// Only a failure to record the status is returned as an error.
    pub async fn deliver(&self, student: &StudentRecord) -> Result<CertificateStatus, DeliveryError> {
        let qr_code = match self.encode_qr(student).await {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!(
                    "certificate {}: rendering without QR code: {}",
                    student.certificate_id,
                    e
                );
                None
            }
        };

        let pdf = match self
            .renderer
            .render(student, &self.background, qr_code.as_deref())
            .await
        {
            Ok(pdf) => pdf,
            Err(e) => {
                log::error!("certificate {}: {}", student.certificate_id, e);
                return self.set_status(student, CertificateStatus::Failed).await;
            }
        };
        self.set_status(student, CertificateStatus::Generated).await?;

        let message = compose_certificate_email(student, Some(pdf.as_path()), &self.composer);
        match self.mailer.send(&message).await {
            Ok(()) => {
                log::info!("certificate {} sent to {}", student.certificate_id, student.email);
                self.set_status(student, CertificateStatus::Sent).await
            }
            Err(e) => {
                log::error!("certificate {}: {}", student.certificate_id, e);
                self.set_status(student, CertificateStatus::Failed).await
            }
        }
    }

    pub async fn deliver_all(&self, students: &[StudentRecord]) -> Result<DeliverySummary, DeliveryError> {
        let mut summary = DeliverySummary {
            total: students.len(),
            ..Default::default()
        };
        for student in students {
            match self.deliver(student).await? {
                CertificateStatus::Sent => summary.sent += 1,
                _ => summary.failed += 1,
            }
        }
        Ok(summary)
    }

    async fn encode_qr(&self, student: &StudentRecord) -> Result<PathBuf, DeliveryError> {
        let payload = self
            .composer
            .compose_json(&student.certificate_id, Some(student))
            .map_err(|e| DeliveryError::Qr(e.to_string()))?;
        self.qr.encode(&payload, &student.certificate_id).await
    }

    async fn set_status(
        &self,
        student: &StudentRecord,
        status: CertificateStatus,
    ) -> Result<CertificateStatus, DeliveryError> {
        self.store.update_certificate_status(student.id, status).await?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::student::model::NewStudent;
    use chrono::NaiveDate;
    use parking_lot::Mutex;

    struct FakeQr {
        fail: bool,
    }

    #[async_trait]
    impl QrEncoder for FakeQr {
        async fn encode(&self, _payload: &str, certificate_id: &str) -> Result<PathBuf, DeliveryError> {
            if self.fail {
                return Err(DeliveryError::Qr("encoder offline".to_string()));
            }
            Ok(PathBuf::from(format!("qr_{}.png", certificate_id)))
        }
    }

    struct FakeRenderer {
        fail: bool,
        seen_qr: Mutex<Vec<Option<PathBuf>>>,
    }

    #[async_trait]
    impl CertificateRenderer for FakeRenderer {
        async fn render(
            &self,
            student: &StudentRecord,
            _background: &Path,
            qr_code: Option<&Path>,
        ) -> Result<PathBuf, DeliveryError> {
            self.seen_qr.lock().push(qr_code.map(Path::to_path_buf));
            if self.fail {
                return Err(DeliveryError::Render("missing background".to_string()));
            }
            Ok(PathBuf::from(format!("certificate_{}.pdf", student.certificate_id)))
        }
    }

    struct FakeMailer {
        fail: bool,
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailDispatcher for FakeMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError::Email("smtp refused".to_string()));
            }
            self.sent.lock().push(message.clone());
            Ok(())
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_student(roll: &str) -> NewStudent {
        NewStudent {
            student_name: "Asha Rao".to_string(),
            roll_number: roll.to_string(),
            branch: "CSE".to_string(),
            college_name: "Andhra University".to_string(),
            email: "asha.rao@example.edu".to_string(),
            phone_number: None,
            internship_name: "Data Engineering".to_string(),
            internship_start_date: ymd(2024, 6, 1),
            internship_end_date: ymd(2024, 7, 27),
            duration_weeks: Some(8),
            mentor_name: Some("Dr. Rao".to_string()),
            mentor_email: None,
            internship_location: None,
            company_name: None,
            performance_rating: None,
            skills_acquired: None,
            project_title: None,
            certificate_id: format!("CERT-20240801-{}", roll),
            date_of_issue: ymd(2024, 8, 1),
            remarks: None,
            certificate_status: CertificateStatus::Pending,
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        renderer: Arc<FakeRenderer>,
        mailer: Arc<FakeMailer>,
        delivery: CertificateDelivery,
    }

    fn harness(qr_fails: bool, render_fails: bool, mail_fails: bool) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let renderer = Arc::new(FakeRenderer {
            fail: render_fails,
            seen_qr: Mutex::new(Vec::new()),
        });
        let mailer = Arc::new(FakeMailer {
            fail: mail_fails,
            sent: Mutex::new(Vec::new()),
        });
        let delivery = CertificateDelivery::new(
            store.clone(),
            renderer.clone(),
            Arc::new(FakeQr { fail: qr_fails }),
            mailer.clone(),
            VerificationComposer::new("https://certs.example.org", "Example Skills Council"),
            PathBuf::from("background.png"),
        );
        Harness {
            store,
            renderer,
            mailer,
            delivery,
        }
    }

    async fn seed(store: &MemoryStore, rolls: &[&str]) -> Vec<StudentRecord> {
        let students: Vec<NewStudent> = rolls.iter().map(|r| new_student(r)).collect();
        store.insert_students(&students).await.unwrap()
    }

    fn stored_status(store: &MemoryStore, roll: &str) -> CertificateStatus {
        store
            .students()
            .into_iter()
            .find(|s| s.roll_number == roll)
            .unwrap()
            .certificate_status
    }

    #[test]
    fn test_email_composition() {
        let record = new_student("A1").into_record(uuid::Uuid::new_v4(), chrono::Utc::now());
        let composer = VerificationComposer::new("https://certs.example.org", "Issuer");
        let message = compose_certificate_email(&record, Some(Path::new("/tmp/c.pdf")), &composer);

        assert_eq!(message.subject, "Internship Certificate - Data Engineering");
        assert_eq!(message.to, "asha.rao@example.edu");
        assert!(message.html_body.contains("<strong>Mentor:</strong> Dr. Rao"));
        assert!(!message.html_body.contains("Company:"));
        assert!(message
            .html_body
            .contains("https://certs.example.org/certificate/CERT-20240801-A1"));
        let attachment = message.attachment.unwrap();
        assert_eq!(attachment.filename, "certificate_CERT-20240801-A1.pdf");
        assert_eq!(attachment.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_successful_delivery_marks_sent() {
        let h = harness(false, false, false);
        let students = seed(&h.store, &["A1"]).await;

        let status = h.delivery.deliver(&students[0]).await.unwrap();
        assert_eq!(status, CertificateStatus::Sent);
        assert_eq!(stored_status(&h.store, "A1"), CertificateStatus::Sent);
        assert_eq!(h.mailer.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_qr_failure_still_renders() {
        let h = harness(true, false, false);
        let students = seed(&h.store, &["A1"]).await;

        let status = h.delivery.deliver(&students[0]).await.unwrap();
        assert_eq!(status, CertificateStatus::Sent);
        assert_eq!(h.renderer.seen_qr.lock().as_slice(), &[None]);
    }

    #[tokio::test]
    async fn test_render_failure_marks_failed_without_email() {
        let h = harness(false, true, false);
        let students = seed(&h.store, &["A1"]).await;

        let status = h.delivery.deliver(&students[0]).await.unwrap();
        assert_eq!(status, CertificateStatus::Failed);
        assert_eq!(stored_status(&h.store, "A1"), CertificateStatus::Failed);
        assert!(h.mailer.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_email_failure_marks_failed() {
        let h = harness(false, false, true);
        let students = seed(&h.store, &["A1", "A2"]).await;

        let summary = h.delivery.deliver_all(&students).await.unwrap();
        assert_eq!(
            summary,
            DeliverySummary {
                total: 2,
                sent: 0,
                failed: 2
            }
        );
        assert_eq!(stored_status(&h.store, "A2"), CertificateStatus::Failed);
    }
}
