//! Case, case decision, and case document queries.

use super::{parse_enum, parse_opt_ts, parse_ts, AmlStore};
use crate::{
    error::AmlResult,
    types::{
        ts_to_db, Case, CaseDecision, CaseDocument, CaseStatus, Classification, DecisionKind,
    },
};
use rusqlite::{params, OptionalExtension, Row};

const CASE_COLUMNS: &str = "case_id, alert_id, account_number, transaction_id,
    case_status, case_score, classification,
    behavioral_score, behavioral_summary, network_score, network_summary,
    contextual_score, contextual_summary, evidence_score, evidence_summary,
    false_positive_score, false_positive_summary,
    assigned_to, assigned_date, case_opened_date, case_closed_date, case_summary";

fn case_row_mapper(row: &Row<'_>) -> rusqlite::Result<Case> {
    Ok(Case {
        case_id: row.get(0)?,
        alert_id: row.get(1)?,
        account_number: row.get(2)?,
        transaction_id: row.get(3)?,
        case_status: parse_enum(row, 4, CaseStatus::parse)?,
        case_score: row.get(5)?,
        classification: parse_enum(row, 6, Classification::parse)?,
        behavioral_score: row.get(7)?,
        behavioral_summary: row.get(8)?,
        network_score: row.get(9)?,
        network_summary: row.get(10)?,
        contextual_score: row.get(11)?,
        contextual_summary: row.get(12)?,
        evidence_score: row.get(13)?,
        evidence_summary: row.get(14)?,
        false_positive_score: row.get(15)?,
        false_positive_summary: row.get(16)?,
        assigned_to: row.get(17)?,
        assigned_date: parse_opt_ts(row, 18)?,
        case_opened_date: parse_ts(row, 19)?,
        case_closed_date: parse_opt_ts(row, 20)?,
        case_summary: row.get(21)?,
    })
}

impl AmlStore {
    // ── Cases ──────────────────────────────────────────────────

    pub fn insert_case(&self, c: &Case) -> AmlResult<()> {
        self.conn.execute(
            "INSERT INTO cases (
                case_id, alert_id, account_number, transaction_id,
                case_status, case_score, classification,
                behavioral_score, behavioral_summary,
                network_score, network_summary,
                contextual_score, contextual_summary,
                evidence_score, evidence_summary,
                false_positive_score, false_positive_summary,
                assigned_to, assigned_date, case_opened_date,
                case_closed_date, case_summary
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                      ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
            params![
                c.case_id,
                c.alert_id,
                c.account_number,
                c.transaction_id,
                c.case_status.as_str(),
                c.case_score,
                c.classification.as_str(),
                c.behavioral_score,
                c.behavioral_summary,
                c.network_score,
                c.network_summary,
                c.contextual_score,
                c.contextual_summary,
                c.evidence_score,
                c.evidence_summary,
                c.false_positive_score,
                c.false_positive_summary,
                c.assigned_to,
                c.assigned_date.map(ts_to_db),
                ts_to_db(c.case_opened_date),
                c.case_closed_date.map(ts_to_db),
                c.case_summary,
            ],
        )?;
        Ok(())
    }

    /// Persist the mutable adjudication fields of a case.
    pub fn update_case(&self, c: &Case) -> AmlResult<()> {
        self.conn.execute(
            "UPDATE cases SET
                case_status = ?1, assigned_to = ?2, assigned_date = ?3,
                case_closed_date = ?4
             WHERE case_id = ?5",
            params![
                c.case_status.as_str(),
                c.assigned_to,
                c.assigned_date.map(ts_to_db),
                c.case_closed_date.map(ts_to_db),
                c.case_id,
            ],
        )?;
        Ok(())
    }

    pub fn get_case(&self, case_id: &str) -> AmlResult<Option<Case>> {
        let sql = format!("SELECT {CASE_COLUMNS} FROM cases WHERE case_id = ?1");
        self.conn
            .query_row(&sql, params![case_id], case_row_mapper)
            .optional()
            .map_err(Into::into)
    }

    pub fn list_cases(
        &self,
        status: Option<CaseStatus>,
        limit: i64,
        offset: i64,
    ) -> AmlResult<Vec<Case>> {
        let sql = format!(
            "SELECT {CASE_COLUMNS} FROM cases
             WHERE (?1 IS NULL OR case_status = ?1)
             ORDER BY case_opened_date DESC
             LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![status.map(|s| s.as_str()), limit, offset],
            case_row_mapper,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn count_cases(&self, status: Option<CaseStatus>) -> AmlResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM cases WHERE (?1 IS NULL OR case_status = ?1)",
                params![status.map(|s| s.as_str())],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn case_for_transaction(&self, transaction_id: &str) -> AmlResult<Option<Case>> {
        let sql = format!(
            "SELECT {CASE_COLUMNS} FROM cases
             WHERE transaction_id = ?1
             ORDER BY case_opened_date DESC LIMIT 1"
        );
        self.conn
            .query_row(&sql, params![transaction_id], case_row_mapper)
            .optional()
            .map_err(Into::into)
    }

    // ── Decisions ──────────────────────────────────────────────

    pub fn insert_decision(&self, d: &CaseDecision) -> AmlResult<CaseDecision> {
        self.conn.execute(
            "INSERT INTO case_decision (
                case_id, decision, decision_by, decision_date,
                decision_reason, next_action
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                d.case_id,
                d.decision.as_str(),
                d.decision_by,
                ts_to_db(d.decision_date),
                d.decision_reason,
                d.next_action,
            ],
        )?;
        let mut out = d.clone();
        out.id = Some(self.conn.last_insert_rowid());
        Ok(out)
    }

    pub fn decisions_for_case(&self, case_id: &str) -> AmlResult<Vec<CaseDecision>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, case_id, decision, decision_by, decision_date,
                    decision_reason, next_action
             FROM case_decision WHERE case_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![case_id], |row| {
            Ok(CaseDecision {
                id: Some(row.get(0)?),
                case_id: row.get(1)?,
                decision: parse_enum(row, 2, DecisionKind::parse)?,
                decision_by: row.get(3)?,
                decision_date: parse_ts(row, 4)?,
                decision_reason: row.get(5)?,
                next_action: row.get(6)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Documents ──────────────────────────────────────────────

    pub fn insert_document(&self, d: &CaseDocument) -> AmlResult<()> {
        self.conn.execute(
            "INSERT INTO case_document (
                document_id, case_id, content_type, content, generated_by, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                d.document_id,
                d.case_id,
                d.content_type,
                d.content,
                d.generated_by,
                d.version,
            ],
        )?;
        Ok(())
    }

    pub fn documents_for_case(&self, case_id: &str) -> AmlResult<Vec<CaseDocument>> {
        let mut stmt = self.conn.prepare(
            "SELECT document_id, case_id, content_type, content, generated_by, version
             FROM case_document WHERE case_id = ?1
             ORDER BY version DESC",
        )?;
        let rows = stmt.query_map(params![case_id], |row| {
            Ok(CaseDocument {
                document_id: row.get(0)?,
                case_id: row.get(1)?,
                content_type: row.get(2)?,
                content: row.get(3)?,
                generated_by: row.get(4)?,
                version: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Latest document of one content type, highest version first.
    pub fn latest_document(
        &self,
        case_id: &str,
        content_type: &str,
    ) -> AmlResult<Option<CaseDocument>> {
        self.conn
            .query_row(
                "SELECT document_id, case_id, content_type, content, generated_by, version
                 FROM case_document
                 WHERE case_id = ?1 AND content_type = ?2
                 ORDER BY version DESC LIMIT 1",
                params![case_id, content_type],
                |row| {
                    Ok(CaseDocument {
                        document_id: row.get(0)?,
                        case_id: row.get(1)?,
                        content_type: row.get(2)?,
                        content: row.get(3)?,
                        generated_by: row.get(4)?,
                        version: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }
}
