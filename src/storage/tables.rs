use redb::TableDefinition;

/// Tables whose values are named-msgpack records keyed by id.
pub type RecordTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Tables mapping one string key to another (secondary indexes and sets).
pub type IndexTable = TableDefinition<'static, &'static str, &'static str>;

/// Teacher records: teacher_id -> Teacher (msgpack)
pub const TEACHERS: RecordTable = TableDefinition::new("teachers");

/// Email index: lower-cased email -> teacher_id
pub const TEACHER_EMAILS: IndexTable = TableDefinition::new("teacher_emails");

/// Department records: uuid -> Department (msgpack)
pub const DEPARTMENTS: RecordTable = TableDefinition::new("departments");

/// Name index: lower-cased department name -> uuid
pub const DEPARTMENT_NAMES: IndexTable = TableDefinition::new("department_names");

/// Student records: id -> Student (msgpack)
pub const STUDENTS: RecordTable = TableDefinition::new("students");

/// Exam records with embedded submissions: id -> Exam (msgpack)
pub const EXAMS: RecordTable = TableDefinition::new("exams");

/// Published result set: exam_id -> RFC 3339 publish time
pub const PUBLISHED_RESULTS: IndexTable = TableDefinition::new("published_results");

/// Controller's sent log: notification id -> Notification (msgpack)
pub const NOTIFICATIONS: RecordTable = TableDefinition::new("notifications");

/// Per-teacher inbox: teacher_id -> msgpack Vec of Notification copies, newest first
pub const TEACHER_INBOX: RecordTable = TableDefinition::new("teacher_inbox");

/// Uploaded document metadata: uuid -> DocumentRecord (msgpack)
pub const DOCUMENTS: RecordTable = TableDefinition::new("documents");
