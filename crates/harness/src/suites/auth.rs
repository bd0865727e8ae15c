use async_trait::async_trait;

use crate::assert::{as_object, ensure, ensure_eq_str};
use crate::endpoints;
use crate::report::{passed, CheckResult, SuiteReport};
use crate::suite::{ProbeContext, Suite};
use crate::suites::anonymous_get_rejected;

pub struct AuthSuite;

const CHECKS: &[&str] = &["current_user", "current_user_requires_auth"];

#[async_trait]
impl Suite for AuthSuite {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    async fn run(&self, ctx: &ProbeContext, report: &mut SuiteReport) {
        report.run("current_user", current_user(ctx)).await;
        let anonymous = anonymous_get_rejected(&ctx.anon, endpoints::AUTH_ME);
        report.run("current_user_requires_auth", anonymous).await;
    }
}

async fn current_user(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get(endpoints::AUTH_ME)
        .await?
        .expect_status(200)?
        .json()?;
    let user = as_object(&body, "current user")?;
    ensure(
        user.contains_key("user_id") || user.contains_key("email"),
        "current user carries neither user_id nor email",
    )?;
    // /me must describe the same account the login answered for
    if let Some(login_id) = ctx.session.user().user_id.as_deref() {
        let me_id = user.get("user_id").and_then(|v| v.as_str()).unwrap_or_default();
        ensure_eq_str(me_id, login_id, "current user_id")?;
    }
    passed()
}
