use crate::config::MessagingConfig;
use crate::domain::message::{Attachment, EnrichedMessage, Message};
use crate::domain::student::StudentSummary;
use crate::domain::user::{Principal, Role, UserProfile};
use crate::error::{AppError, Result};
use crate::services::directory::ParticipantDirectory;
use crate::services::fanout::{ChatEvent, Fanout};
use crate::storage::DbPool;
use crate::storage::message_repo::{MessageRepository, ThreadScope};
use crate::storage::student_repo::StudentRepository;
use crate::storage::user_repo::UserRepository;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use sqlx::PgConnection;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    sent_total: Counter<u64>,
    thread_fetch_size: Histogram<u64>,
    read_marked_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("parentline-server");
        Self {
            sent_total: meter
                .u64_counter("messages_sent_total")
                .with_description("Messages accepted for delivery, labelled by outcome")
                .build(),
            thread_fetch_size: meter
                .u64_histogram("message_thread_fetch_size")
                .with_description("Number of messages returned by a single thread fetch")
                .build(),
            read_marked_total: meter
                .u64_counter("messages_marked_read_total")
                .with_description("Messages transitioned from sent to read")
                .build(),
        }
    }
}

/// Owns the durable message log and the authorization checks applied at write
/// and read time. The fan-out capability is injected; the service never
/// reaches for ambient realtime state.
#[derive(Clone, Debug)]
pub struct MessageService {
    pool: DbPool,
    repo: MessageRepository,
    users: UserRepository,
    students: StudentRepository,
    directory: ParticipantDirectory,
    fanout: Arc<dyn Fanout>,
    config: MessagingConfig,
    metrics: Metrics,
}

impl MessageService {
    #[must_use]
    pub fn new(
        pool: DbPool,
        repo: MessageRepository,
        users: UserRepository,
        students: StudentRepository,
        directory: ParticipantDirectory,
        fanout: Arc<dyn Fanout>,
        config: MessagingConfig,
    ) -> Self {
        Self { pool, repo, users, students, directory, fanout, config, metrics: Metrics::new() }
    }

    /// Sends a message from the authenticated principal to a recipient,
    /// optionally scoped to a student.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` on empty or oversized content.
    /// Returns `AppError::Forbidden` when the student scope does not belong to
    /// the principal. Returns `AppError::NotFound` if the recipient is absent.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, principal, content, attachments),
        fields(sender_id = %principal.id, receiver_id = %receiver_id)
    )]
    pub async fn send_message(
        &self,
        principal: Principal,
        receiver_id: Uuid,
        content: &str,
        student_id: Option<Uuid>,
        attachments: Vec<Attachment>,
    ) -> Result<EnrichedMessage> {
        let content = self.validate_content(content)?;
        if attachments.len() > self.config.max_attachments {
            return Err(AppError::BadRequest(format!(
                "A message may carry at most {} attachments",
                self.config.max_attachments
            )));
        }
        if receiver_id == principal.id {
            return Err(AppError::BadRequest("Sender and receiver must differ".into()));
        }

        if let Some(student_id) = student_id {
            self.authorize_student_scope(principal, student_id).await?;
        }

        if self.directory.find_participant(receiver_id).await?.is_none() {
            return Err(AppError::NotFound("Recipient".into()));
        }

        let mut conn = self.pool.acquire().await?;
        let message =
            match self.repo.create(&mut conn, principal.id, receiver_id, student_id, content, &attachments).await {
                Ok(message) => {
                    self.metrics.sent_total.add(1, &[KeyValue::new("status", "success")]);
                    message
                }
                Err(e) => {
                    self.metrics.sent_total.add(1, &[KeyValue::new("status", "failure")]);
                    return Err(e);
                }
            };

        // The write is durable from here on; enrichment and fan-out only
        // affect the response and the realtime push.
        let enriched = self.enrich_or_bare(&mut conn, message).await;
        drop(conn);

        self.fanout.publish(receiver_id, ChatEvent::NewMessage(Arc::new(enriched.clone()))).await;

        Ok(enriched)
    }

    /// Fetches the principal's thread, optionally scoped to a student or a
    /// counterpart, oldest first. Every unread message addressed to the
    /// principal within the scope transitions to read before the fetch, so
    /// the returned records already reflect the transition.
    ///
    /// # Errors
    /// Returns `AppError::Forbidden` when the principal has no relationship to
    /// the scoped student. Returns `AppError::NotFound` when the scope id
    /// matches neither a student nor a user.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, principal),
        fields(user_id = %principal.id, scope_id = ?scope_id)
    )]
    pub async fn get_thread(&self, principal: Principal, scope_id: Option<Uuid>) -> Result<Vec<EnrichedMessage>> {
        let mut conn = self.pool.acquire().await?;
        let scope = self.resolve_scope(&mut conn, principal, scope_id).await?;

        let marked = self.repo.mark_thread_read(&mut conn, principal.id, scope).await?;
        if marked > 0 {
            self.metrics.read_marked_total.add(marked, &[]);
        }

        let messages = self.repo.fetch_thread(&mut conn, principal.id, scope).await?;
        self.metrics.thread_fetch_size.record(messages.len() as u64, &[]);

        self.enrich_all(&mut conn, messages).await
    }

    /// Parent-initiated conversation with an available teacher. The
    /// availability check and the insert share one transaction with a row
    /// lock on the teacher, so the teacher cannot be flipped unavailable
    /// between the check and the commit without the message rolling back.
    ///
    /// # Errors
    /// Returns `AppError::Forbidden` unless the principal is a parent.
    /// Returns `AppError::TeacherUnavailable` (with alternatives) when the
    /// target exists but is unavailable, and `AppError::NoTeachersAvailable`
    /// when no teacher is reachable at all.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, principal, content),
        fields(sender_id = %principal.id, recipient_id = %recipient_id)
    )]
    pub async fn start_conversation(
        &self,
        principal: Principal,
        recipient_id: Uuid,
        content: &str,
    ) -> Result<EnrichedMessage> {
        if principal.role != Role::Parent {
            return Err(AppError::Forbidden("Parent not found or unauthorized".into()));
        }
        let content = self.validate_content(content)?;
        if recipient_id == principal.id {
            return Err(AppError::BadRequest("Sender and receiver must differ".into()));
        }

        let mut tx = self.pool.begin().await?;
        let teacher = self.users.find_teacher_for_update(&mut *tx, recipient_id).await?;

        let message = match teacher {
            Some(teacher) if teacher.is_available => {
                let message = self.repo.create(&mut *tx, principal.id, recipient_id, None, content, &[]).await?;
                tx.commit().await?;
                self.metrics.sent_total.add(1, &[KeyValue::new("status", "success")]);
                message
            }
            _ => {
                tx.rollback().await?;
                let available = self.directory.available_teachers().await?;
                return if available.is_empty() {
                    Err(AppError::NoTeachersAvailable)
                } else {
                    Err(AppError::TeacherUnavailable { available })
                };
            }
        };

        let mut conn = self.pool.acquire().await?;
        let enriched = self.enrich_or_bare(&mut conn, message).await;
        drop(conn);

        self.fanout.publish(recipient_id, ChatEvent::NewMessage(Arc::new(enriched.clone()))).await;

        Ok(enriched)
    }

    fn validate_content<'a>(&self, content: &'a str) -> Result<&'a str> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("Message content is required".into()));
        }
        if content.chars().count() > self.config.max_content_len {
            return Err(AppError::BadRequest(format!(
                "Message content exceeds {} characters",
                self.config.max_content_len
            )));
        }
        Ok(content)
    }

    async fn authorize_student_scope(&self, principal: Principal, student_id: Uuid) -> Result<()> {
        match principal.role {
            Role::Parent => {
                if !self.directory.guardian_of(principal.id, student_id).await? {
                    return Err(AppError::Forbidden("You can only message about your own children".into()));
                }
            }
            Role::Teacher => {
                if !self.directory.assigned_to(principal.id, student_id).await? {
                    return Err(AppError::Forbidden("You can only message about your own students".into()));
                }
            }
            Role::Admin | Role::Student => {}
        }
        Ok(())
    }

    async fn resolve_scope(
        &self,
        conn: &mut PgConnection,
        principal: Principal,
        scope_id: Option<Uuid>,
    ) -> Result<ThreadScope> {
        let Some(id) = scope_id else {
            return Ok(ThreadScope::All);
        };

        if let Some(student) = self.students.find_by_id(conn, id).await? {
            match principal.role {
                Role::Parent if student.parent_id != principal.id => {
                    return Err(AppError::Forbidden("Unauthorized access".into()));
                }
                Role::Teacher if student.teacher_id != principal.id => {
                    return Err(AppError::Forbidden("Unauthorized access".into()));
                }
                _ => {}
            }
            return Ok(ThreadScope::Student(id));
        }

        if self.users.find_by_id(conn, id).await?.is_some() {
            return Ok(ThreadScope::Counterpart(id));
        }

        Err(AppError::NotFound("Participant".into()))
    }

    async fn enrich_or_bare(&self, conn: &mut PgConnection, message: Message) -> EnrichedMessage {
        match self.enrich_all(conn, vec![message.clone()]).await {
            Ok(mut enriched) if enriched.len() == 1 => enriched.remove(0),
            Ok(_) => EnrichedMessage::bare(message),
            Err(e) => {
                tracing::warn!(error = %e, "Message enrichment failed, returning bare record");
                EnrichedMessage::bare(message)
            }
        }
    }

    async fn enrich_all(&self, conn: &mut PgConnection, messages: Vec<Message>) -> Result<Vec<EnrichedMessage>> {
        let mut user_ids: Vec<Uuid> = Vec::new();
        let mut student_ids: Vec<Uuid> = Vec::new();
        for message in &messages {
            for id in [message.sender_id, message.receiver_id] {
                if !user_ids.contains(&id) {
                    user_ids.push(id);
                }
            }
            if let Some(id) = message.student_id
                && !student_ids.contains(&id)
            {
                student_ids.push(id);
            }
        }

        let profiles: HashMap<Uuid, UserProfile> =
            self.users.find_profiles(conn, &user_ids).await?.into_iter().map(|p| (p.id, p)).collect();
        let students: HashMap<Uuid, StudentSummary> = if student_ids.is_empty() {
            HashMap::new()
        } else {
            self.students.find_summaries(conn, &student_ids).await?.into_iter().map(|s| (s.id, s)).collect()
        };

        Ok(messages
            .into_iter()
            .map(|message| EnrichedMessage {
                sender: profiles.get(&message.sender_id).cloned(),
                receiver: profiles.get(&message.receiver_id).cloned(),
                student: message.student_id.and_then(|id| students.get(&id).cloned()),
                message,
            })
            .collect())
    }
}
