//! Document attachments: upload, list, download, lookup by ids, delete.

use async_trait::async_trait;
use models::attachment::{
    Attachment, AttachmentEntity, AttachmentEnvelope, AttachmentList, ATTACHMENT_FIELDS,
};

use crate::assert::{
    as_array, boolean, ensure, ensure_detail_mentions, ensure_eq_str, field, require_fields,
};
use crate::endpoints;
use crate::error::ProbeError;
use crate::fixtures::SampleFile;
use crate::report::{passed, skipped, CheckResult, SuiteReport};
use crate::session::{ApiClient, ApiResponse};
use crate::suite::{ProbeContext, Suite};
use crate::suites::anonymous_get_rejected;

pub struct AttachmentsSuite;

const CHECKS: &[&str] = &[
    "upload_pdf_cashbook",
    "upload_jpeg_expense",
    "upload_png_project",
    "upload_pdf_liability",
    "disallowed_file_type_rejected",
    "invalid_entity_type_rejected",
    "empty_entity_id_rejected",
    "upload_requires_auth",
    "list_per_entity_type",
    "list_invalid_entity_type_rejected",
    "list_requires_auth",
    "download",
    "download_missing",
    "download_requires_auth",
    "by_ids",
    "by_ids_empty",
    "by_ids_requires_auth",
    "delete",
    "delete_missing",
    "delete_requires_auth",
    "metadata_fields",
    "file_path_layout",
];

const MISSING_ID: &str = "nonexistent_id_12345";

#[async_trait]
impl Suite for AttachmentsSuite {
    fn name(&self) -> &'static str {
        "attachments"
    }

    fn checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    async fn run(&self, ctx: &ProbeContext, report: &mut SuiteReport) {
        let entity_id = ctx.fixtures.entity_id("test_entity");
        let mut uploaded: Option<Attachment> = None;

        report
            .run(
                "upload_pdf_cashbook",
                upload_check(
                    ctx,
                    AttachmentEntity::Cashbook,
                    &entity_id,
                    SampleFile::pdf("test_document.pdf", "test content"),
                    Some(&mut uploaded),
                ),
            )
            .await;
        report
            .run(
                "upload_jpeg_expense",
                upload_check(
                    ctx,
                    AttachmentEntity::Expense,
                    &entity_id,
                    SampleFile::jpeg("test_image.jpg"),
                    None,
                ),
            )
            .await;
        report
            .run(
                "upload_png_project",
                upload_check(
                    ctx,
                    AttachmentEntity::Project,
                    &entity_id,
                    SampleFile::png("test_image.png"),
                    None,
                ),
            )
            .await;
        report
            .run(
                "upload_pdf_liability",
                upload_check(
                    ctx,
                    AttachmentEntity::Liability,
                    &entity_id,
                    SampleFile::pdf("liability_proof.pdf", "liability proof"),
                    None,
                ),
            )
            .await;

        report
            .run(
                "disallowed_file_type_rejected",
                upload_rejected(
                    ctx,
                    "cashbook",
                    &entity_id,
                    SampleFile::text("test.txt"),
                    &["not allowed", "supported"],
                ),
            )
            .await;
        report
            .run(
                "invalid_entity_type_rejected",
                upload_rejected(
                    ctx,
                    "invalid_type",
                    &entity_id,
                    SampleFile::pdf("test.pdf", "test"),
                    &["invalid entity type"],
                ),
            )
            .await;
        report
            .run(
                "empty_entity_id_rejected",
                upload_rejected(
                    ctx,
                    "cashbook",
                    "",
                    SampleFile::pdf("test.pdf", "test"),
                    &["entity_id"],
                ),
            )
            .await;
        report.run("upload_requires_auth", upload_anonymous(&ctx.anon)).await;

        report.run("list_per_entity_type", list_per_entity(ctx, &entity_id)).await;
        report
            .run("list_invalid_entity_type_rejected", list_invalid_entity(ctx))
            .await;
        report
            .run(
                "list_requires_auth",
                anonymous_get_rejected(
                    &ctx.anon,
                    &endpoints::attachments_for("cashbook", "test123"),
                ),
            )
            .await;

        let uploaded_id = uploaded.as_ref().map(|a| a.attachment_id.as_str());
        report.run("download", download(ctx, uploaded_id)).await;
        report.run("download_missing", download_missing(ctx)).await;
        report
            .run(
                "download_requires_auth",
                anonymous_get_rejected(&ctx.anon, &endpoints::attachment_download("any_id")),
            )
            .await;

        report.run("by_ids", by_ids(ctx, uploaded_id)).await;
        report.run("by_ids_empty", by_ids_empty(ctx)).await;
        report.run("by_ids_requires_auth", by_ids_anonymous(&ctx.anon)).await;

        report.run("delete", delete(ctx)).await;
        report.run("delete_missing", delete_missing(ctx)).await;
        report.run("delete_requires_auth", delete_anonymous(&ctx.anon)).await;

        report.run("metadata_fields", metadata_fields(ctx)).await;
        report.run("file_path_layout", file_path_layout(ctx)).await;
    }
}

fn upload_query<'a>(
    entity_type: &'a str,
    entity_id: &'a str,
    description: &'a str,
) -> [(&'static str, &'a str); 3] {
    [
        ("entity_type", entity_type),
        ("entity_id", entity_id),
        ("description", description),
    ]
}

async fn post_upload(
    client: &ApiClient,
    entity_type: &str,
    entity_id: &str,
    description: &str,
    file: &SampleFile,
) -> Result<ApiResponse, ProbeError> {
    let query = upload_query(entity_type, entity_id, description);
    client
        .upload(endpoints::ATTACHMENT_UPLOAD, &query, file)
        .await
}

/// Uploads `file` and checks the envelope echoes entity and MIME type.
async fn upload(
    ctx: &ProbeContext,
    entity: AttachmentEntity,
    entity_id: &str,
    file: &SampleFile,
    description: &str,
) -> Result<Attachment, ProbeError> {
    let envelope: AttachmentEnvelope =
        post_upload(&ctx.session, entity.as_str(), entity_id, description, file)
            .await?
            .expect_status(200)?
            .json_as()?;
    ensure(envelope.success, "upload success is false")?;
    let attachment = envelope.attachment;
    ensure_eq_str(&attachment.entity_type, entity.as_str(), "attachment entity_type")?;
    ensure_eq_str(&attachment.entity_id, entity_id, "attachment entity_id")?;
    ensure_eq_str(&attachment.mime_type, file.mime_type, "attachment mime_type")?;
    Ok(attachment)
}

async fn upload_check(
    ctx: &ProbeContext,
    entity: AttachmentEntity,
    entity_id: &str,
    file: SampleFile,
    slot: Option<&mut Option<Attachment>>,
) -> CheckResult {
    let description = format!("Probe {} attachment", file.mime_type);
    let attachment = upload(ctx, entity, entity_id, &file, &description).await?;
    if let Some(slot) = slot {
        *slot = Some(attachment);
    }
    passed()
}

async fn upload_rejected(
    ctx: &ProbeContext,
    entity_type: &str,
    entity_id: &str,
    file: SampleFile,
    detail_mentions: &[&str],
) -> CheckResult {
    let resp = post_upload(&ctx.session, entity_type, entity_id, "Rejected upload", &file).await?;
    resp.expect_status(400)?;
    ensure_detail_mentions(&resp, detail_mentions)?;
    passed()
}

async fn upload_anonymous(anon: &ApiClient) -> CheckResult {
    let file = SampleFile::pdf("test.pdf", "test");
    post_upload(anon, "cashbook", "test123", "Unauthenticated", &file)
        .await?
        .expect_status(401)?;
    passed()
}

async fn list_per_entity(ctx: &ProbeContext, entity_id: &str) -> CheckResult {
    for entity in AttachmentEntity::ALL {
        let path = endpoints::attachments_for(entity.as_str(), entity_id);
        let body = ctx.session.get(&path).await?.expect_status(200)?.json()?;
        require_fields(&body, &path, &["attachments", "count"])?;
        as_array(&body["attachments"], &path)?;
    }
    passed()
}

async fn list_invalid_entity(ctx: &ProbeContext) -> CheckResult {
    ctx.session
        .get(&endpoints::attachments_for("invalid_type", "test123"))
        .await?
        .expect_status(400)?;
    passed()
}

async fn download(ctx: &ProbeContext, uploaded_id: Option<&str>) -> CheckResult {
    let Some(id) = uploaded_id else {
        return skipped("no uploaded attachment available");
    };
    let resp = ctx.session.get(&endpoints::attachment_download(id)).await?;
    resp.expect_status(200)?;
    ensure(!resp.body.is_empty(), "downloaded attachment is empty")?;
    passed()
}

async fn download_missing(ctx: &ProbeContext) -> CheckResult {
    ctx.session
        .get(&endpoints::attachment_download(MISSING_ID))
        .await?
        .expect_status(404)?;
    passed()
}

async fn by_ids(ctx: &ProbeContext, uploaded_id: Option<&str>) -> CheckResult {
    let Some(id) = uploaded_id else {
        return skipped("no uploaded attachment available");
    };
    let list: AttachmentList = ctx
        .session
        .get_query(endpoints::ATTACHMENTS_BY_IDS, &[("ids", id)])
        .await?
        .expect_status(200)?
        .json_as()?;
    ensure(
        !list.attachments.is_empty(),
        format!("by-ids returned nothing for {id}"),
    )?;
    passed()
}

async fn by_ids_empty(ctx: &ProbeContext) -> CheckResult {
    let list: AttachmentList = ctx
        .session
        .get_query(endpoints::ATTACHMENTS_BY_IDS, &[("ids", "")])
        .await?
        .expect_status(200)?
        .json_as()?;
    ensure(
        list.attachments.is_empty(),
        "by-ids with empty ids returned attachments",
    )?;
    passed()
}

async fn by_ids_anonymous(anon: &ApiClient) -> CheckResult {
    anon.get_query(endpoints::ATTACHMENTS_BY_IDS, &[("ids", "test_id")])
        .await?
        .expect_status(401)?;
    passed()
}

async fn delete(ctx: &ProbeContext) -> CheckResult {
    let entity_id = ctx.fixtures.entity_id("delete_test_entity");
    let file = SampleFile::pdf("delete_me.pdf", "to be deleted");
    let attachment = upload(
        ctx,
        AttachmentEntity::Cashbook,
        &entity_id,
        &file,
        "To be deleted",
    )
    .await?;

    let body = ctx
        .session
        .delete(&endpoints::attachment(&attachment.attachment_id))
        .await?
        .expect_status(200)?
        .json()?;
    ensure(boolean(&body, "success")?, "delete success is false")?;

    ctx.session
        .get(&endpoints::attachment_download(&attachment.attachment_id))
        .await?
        .expect_status(404)?;
    passed()
}

async fn delete_missing(ctx: &ProbeContext) -> CheckResult {
    ctx.session
        .delete(&endpoints::attachment(MISSING_ID))
        .await?
        .expect_status(404)?;
    passed()
}

async fn delete_anonymous(anon: &ApiClient) -> CheckResult {
    anon.delete(&endpoints::attachment("any_id"))
        .await?
        .expect_status(401)?;
    passed()
}

async fn metadata_fields(ctx: &ProbeContext) -> CheckResult {
    let entity_id = ctx.fixtures.entity_id("metadata_test");
    let description = "Metadata test description";
    let file = SampleFile::pdf("metadata_test.pdf", "metadata test");
    let body = post_upload(&ctx.session, "cashbook", &entity_id, description, &file)
        .await?
        .expect_status(200)?
        .json()?;
    let raw = field(&body, "attachment")?;
    require_fields(raw, "attachment", ATTACHMENT_FIELDS)?;

    let attachment: Attachment = serde_json::from_value(raw.clone())
        .map_err(|e| ProbeError::Shape(format!("attachment metadata: {e}")))?;
    ensure_eq_str(&attachment.entity_type, "cashbook", "entity_type")?;
    ensure_eq_str(&attachment.entity_id, &entity_id, "entity_id")?;
    ensure(
        attachment.description.as_deref() == Some(description),
        "description not echoed",
    )?;
    ensure(attachment.file_size > 0, "file_size must be positive")?;
    passed()
}

async fn file_path_layout(ctx: &ProbeContext) -> CheckResult {
    let entity_id = ctx.fixtures.entity_id("path_test");
    let file = SampleFile::pdf("path_test.pdf", "path test");
    let attachment = upload(
        ctx,
        AttachmentEntity::Expense,
        &entity_id,
        &file,
        "Path structure test",
    )
    .await?;
    attachment
        .validate_file_path()
        .map_err(|e| ProbeError::Assertion(e.to_string()))?;
    passed()
}
