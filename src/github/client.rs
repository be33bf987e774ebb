use async_trait::async_trait;
use chrono::SecondsFormat;
use octocrab::models::{self, CommentId};
use octocrab::Octocrab;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::platform::Platform;
use super::types::{Author, Comment, CommitRef, CompareStatus, PullRequest, Tag};
use crate::error::Result;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const PAGE_SIZE: u8 = 100;

// Characters that would end or reshape a path segment. `/` stays literal so
// slashed ref names reach the compare endpoint unchanged.
const REF_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn encode_ref(name: &str) -> String {
    utf8_percent_encode(name, REF_SET).to_string()
}

#[derive(Serialize)]
struct PageParams {
    per_page: u8,
    page: u32,
}

// Compare responses, reduced to the fields read here.
#[derive(Deserialize)]
struct Comparison {
    status: CompareStatus,
    #[serde(default)]
    commits: Vec<ComparedCommit>,
}

#[derive(Deserialize)]
struct ComparedCommit {
    sha: String,
}

impl From<models::pulls::PullRequest> for PullRequest {
    fn from(pr: models::pulls::PullRequest) -> Self {
        PullRequest {
            number: pr.number,
            title: pr.title.unwrap_or_default(),
            merged_at: pr
                .merged_at
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            base_ref: pr.base.ref_field,
            head_ref: Some(pr.head.ref_field).filter(|r| !r.is_empty()),
            author: pr.user.map(|user| {
                let user = *user;
                Author {
                    login: user.login,
                    avatar_url: Some(user.avatar_url.to_string()),
                    profile_url: Some(user.html_url.to_string()),
                }
            }),
            url: pr.html_url.map(|u| u.to_string()).unwrap_or_default(),
            labels: pr
                .labels
                .unwrap_or_default()
                .into_iter()
                .map(|label| label.name)
                .collect(),
        }
    }
}

impl From<models::issues::Comment> for Comment {
    fn from(comment: models::issues::Comment) -> Self {
        Comment {
            id: comment.id.0,
            body: comment.body.unwrap_or_default(),
        }
    }
}

/// GitHub REST client scoped to a single repository.
pub struct GitHubClient {
    client: Octocrab,
    owner: String,
    repo: String,
}

impl GitHubClient {
    pub fn new(token: String, owner: String, repo: String, api_url: &str) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(token)
            .base_uri(api_url)?
            .build()?;
        Ok(Self { client, owner, repo })
    }

    fn compare_route(&self, base: &str, head: &str) -> String {
        format!(
            "/repos/{}/{}/compare/{}...{}",
            self.owner,
            self.repo,
            encode_ref(base),
            encode_ref(head)
        )
    }
}

#[async_trait]
impl Platform for GitHubClient {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let first = self
            .client
            .repos(&self.owner, &self.repo)
            .list_tags()
            .per_page(PAGE_SIZE)
            .send()
            .await?;
        let tags = self.client.all_pages(first).await?;

        debug!(count = tags.len(), "fetched tags");
        Ok(tags.into_iter().map(|t| Tag { name: t.name }).collect())
    }

    async fn compare_status(&self, base: &str, head: &str) -> Result<CompareStatus> {
        let params = PageParams {
            per_page: 1,
            page: 1,
        };
        let comparison: Comparison = self
            .client
            .get(self.compare_route(base, head), Some(&params))
            .await?;
        Ok(comparison.status)
    }

    async fn commits_between(&self, base: &str, head: &str) -> Result<Vec<CommitRef>> {
        let route = self.compare_route(base, head);
        let mut commits = Vec::new();
        let mut page = 1;

        // Compare returns an object, not a list, so `all_pages` does not apply.
        loop {
            let params = PageParams {
                per_page: PAGE_SIZE,
                page,
            };
            let comparison: Comparison = self.client.get(&route, Some(&params)).await?;
            let done = comparison.commits.len() < usize::from(PAGE_SIZE);
            commits.extend(comparison.commits.into_iter().map(|c| CommitRef { sha: c.sha }));
            if done {
                break;
            }
            page += 1;
        }

        debug!(base, head, pages = page, count = commits.len(), "fetched compared commits");
        Ok(commits)
    }

    async fn pull_requests_for_commit(&self, sha: &str) -> Result<Vec<PullRequest>> {
        let route = format!("/repos/{}/{}/commits/{}/pulls", self.owner, self.repo, sha);
        let prs: Vec<models::pulls::PullRequest> = self.client.get(route, None::<&()>).await?;
        Ok(prs.into_iter().map(PullRequest::from).collect())
    }

    async fn pull_request_detail(&self, number: u64) -> Result<PullRequest> {
        let pr = self.client.pulls(&self.owner, &self.repo).get(number).await?;
        Ok(pr.into())
    }

    async fn list_comments(&self, issue: u64) -> Result<Vec<Comment>> {
        let first = self
            .client
            .issues(&self.owner, &self.repo)
            .list_comments(issue)
            .per_page(PAGE_SIZE)
            .send()
            .await?;
        let comments = self.client.all_pages(first).await?;
        Ok(comments.into_iter().map(Comment::from).collect())
    }

    async fn create_comment(&self, issue: u64, body: &str) -> Result<Comment> {
        let comment = self
            .client
            .issues(&self.owner, &self.repo)
            .create_comment(issue, body)
            .await?;
        Ok(comment.into())
    }

    async fn update_comment(&self, id: u64, body: &str) -> Result<()> {
        self.client
            .issues(&self.owner, &self.repo)
            .update_comment(CommentId(id), body)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn client(server: &ServerGuard) -> GitHubClient {
        GitHubClient::new(
            "fake".to_string(),
            "acme".to_string(),
            "demo".to_string(),
            &server.url(),
        )
        .unwrap()
    }

    fn user_json(login: &str) -> Value {
        let api = format!("https://api.github.com/users/{login}");
        json!({
            "login": login,
            "id": 1,
            "node_id": "MDQ6VXNlcjE=",
            "avatar_url": "https://avatars.githubusercontent.com/u/1",
            "gravatar_id": "",
            "url": api,
            "html_url": format!("https://github.com/{login}"),
            "followers_url": format!("{api}/followers"),
            "following_url": format!("{api}/following"),
            "gists_url": format!("{api}/gists"),
            "starred_url": format!("{api}/starred"),
            "subscriptions_url": format!("{api}/subscriptions"),
            "organizations_url": format!("{api}/orgs"),
            "repos_url": format!("{api}/repos"),
            "events_url": format!("{api}/events"),
            "received_events_url": format!("{api}/received_events"),
            "type": "User",
            "site_admin": false
        })
    }

    fn tag_json(name: &str) -> Value {
        json!({
            "name": name,
            "commit": {
                "sha": "c0ffee",
                "url": "https://api.github.com/repos/acme/demo/commits/c0ffee"
            },
            "zipball_url": format!("https://api.github.com/repos/acme/demo/zipball/{name}"),
            "tarball_url": format!("https://api.github.com/repos/acme/demo/tarball/{name}"),
            "node_id": "MDM6UmVm"
        })
    }

    fn comment_json(id: u64, body: &str) -> Value {
        json!({
            "id": id,
            "node_id": "MDEyOklzc3VlQ29tbWVudDE=",
            "url": format!("https://api.github.com/repos/acme/demo/issues/comments/{id}"),
            "html_url": format!("https://github.com/acme/demo/pull/42#issuecomment-{id}"),
            "issue_url": "https://api.github.com/repos/acme/demo/issues/42",
            "body": body,
            "user": user_json("release-bot"),
            "created_at": "2024-12-01T00:00:00Z",
            "updated_at": "2024-12-01T00:00:00Z"
        })
    }

    fn pull_json(number: u64, title: &str, merged_at: Option<&str>, login: &str, labels: &[&str]) -> Value {
        json!({
            "url": format!("https://api.github.com/repos/acme/demo/pulls/{number}"),
            "id": number * 1000,
            "node_id": "MDExOlB1bGxSZXF1ZXN0MQ==",
            "html_url": format!("https://github.com/acme/demo/pull/{number}"),
            "number": number,
            "state": "closed",
            "locked": false,
            "maintainer_can_modify": false,
            "title": title,
            "user": user_json(login),
            "labels": labels.iter().enumerate().map(|(i, name)| json!({
                "id": i,
                "node_id": "MDU6TGFiZWwx",
                "url": format!("https://api.github.com/repos/acme/demo/labels/{name}"),
                "name": name,
                "description": null,
                "color": "ededed",
                "default": false
            })).collect::<Vec<_>>(),
            "created_at": "2024-11-30T00:00:00Z",
            "merged_at": merged_at,
            "head": { "label": "acme:feature/new", "ref": "feature/new", "sha": "c1" },
            "base": { "label": "acme:main", "ref": "main", "sha": "c0" }
        })
    }

    #[tokio::test]
    async fn lists_tags_in_listing_order() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/demo/tags")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(json!([tag_json("v2.0.0"), tag_json("v1.0.0")]).to_string())
            .create_async()
            .await;

        let tags = client(&server).list_tags().await.unwrap();

        assert_eq!(
            tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            vec!["v2.0.0", "v1.0.0"]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn follows_tag_pages_to_the_end() {
        let mut server = Server::new_async().await;
        let next = format!("{}/repos/acme/demo/tags?per_page=100&page=2", server.url());
        let first_page: Vec<Value> = (0..100).map(|i| tag_json(&format!("v1.{i}.0"))).collect();
        let first = server
            .mock("GET", "/repos/acme/demo/tags")
            .match_query(Matcher::Exact("per_page=100".to_string()))
            .with_header("content-type", "application/json")
            .with_header("link", &format!("<{next}>; rel=\"next\", <{next}>; rel=\"last\""))
            .with_body(Value::Array(first_page).to_string())
            .create_async()
            .await;
        let second = server
            .mock("GET", "/repos/acme/demo/tags")
            .match_query(Matcher::UrlEncoded("page".to_string(), "2".to_string()))
            .with_header("content-type", "application/json")
            .with_body(json!([tag_json("v0.1.0")]).to_string())
            .create_async()
            .await;

        let tags = client(&server).list_tags().await.unwrap();

        assert_eq!(tags.len(), 101);
        assert_eq!(tags[0].name, "v1.0.0");
        assert_eq!(tags[100].name, "v0.1.0");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn reads_comparison_status_and_commits() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/acme/demo/compare/v1.0.0...headsha")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "status": "ahead", "commits": [{ "sha": "c1" }, { "sha": "c2" }] })
                    .to_string(),
            )
            .expect_at_least(2)
            .create_async()
            .await;

        let client = client(&server);
        let status = client.compare_status("v1.0.0", "headsha").await.unwrap();
        let commits = client.commits_between("v1.0.0", "headsha").await.unwrap();

        assert_eq!(status, CompareStatus::Ahead);
        assert_eq!(
            commits,
            vec![
                CommitRef { sha: "c1".to_string() },
                CommitRef { sha: "c2".to_string() }
            ]
        );
    }

    #[tokio::test]
    async fn follows_compare_pages_to_the_end() {
        let mut server = Server::new_async().await;
        let full: Vec<Value> = (0..100).map(|i| json!({ "sha": format!("c{i}") })).collect();
        let first = server
            .mock("GET", "/repos/acme/demo/compare/v1.0.0...headsha")
            .match_query(Matcher::UrlEncoded("page".to_string(), "1".to_string()))
            .with_header("content-type", "application/json")
            .with_body(json!({ "status": "ahead", "commits": full }).to_string())
            .create_async()
            .await;
        let second = server
            .mock("GET", "/repos/acme/demo/compare/v1.0.0...headsha")
            .match_query(Matcher::UrlEncoded("page".to_string(), "2".to_string()))
            .with_header("content-type", "application/json")
            .with_body(json!({ "status": "ahead", "commits": [{ "sha": "c100" }] }).to_string())
            .create_async()
            .await;

        let commits = client(&server).commits_between("v1.0.0", "headsha").await.unwrap();

        assert_eq!(commits.len(), 101);
        assert_eq!(commits[0].sha, "c0");
        assert_eq!(commits[100].sha, "c100");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn tag_names_are_encoded_in_the_compare_path() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/demo/compare/v1.0%23rc...release/v1")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(json!({ "status": "identical", "commits": [] }).to_string())
            .create_async()
            .await;

        let status = client(&server)
            .compare_status("v1.0#rc", "release/v1")
            .await
            .unwrap();

        assert_eq!(status, CompareStatus::Identical);
        mock.assert_async().await;
    }

    #[test]
    fn encode_ref_escapes_url_delimiters_only() {
        assert_eq!(encode_ref("v1.0#rc"), "v1.0%23rc");
        assert_eq!(encode_ref("v100%"), "v100%25");
        assert_eq!(encode_ref("release/v1.2"), "release/v1.2");
    }

    #[tokio::test]
    async fn converts_associated_pull_requests() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/acme/demo/commits/c1/pulls")
            .with_header("content-type", "application/json")
            .with_body(
                json!([pull_json(123, "feat: add feature", Some("2024-12-01T00:00:00Z"), "alice", &["feature"])])
                    .to_string(),
            )
            .create_async()
            .await;

        let prs = client(&server).pull_requests_for_commit("c1").await.unwrap();

        assert_eq!(
            prs,
            vec![PullRequest {
                number: 123,
                title: "feat: add feature".to_string(),
                merged_at: Some("2024-12-01T00:00:00Z".to_string()),
                base_ref: "main".to_string(),
                head_ref: Some("feature/new".to_string()),
                author: Some(Author {
                    login: "alice".to_string(),
                    avatar_url: Some("https://avatars.githubusercontent.com/u/1".to_string()),
                    profile_url: Some("https://github.com/alice".to_string()),
                }),
                url: "https://github.com/acme/demo/pull/123".to_string(),
                labels: vec!["feature".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn fetches_pull_request_detail() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/acme/demo/pulls/124")
            .with_header("content-type", "application/json")
            .with_body(pull_json(124, "fix: critical bug", None, "bob", &["bug", "backend"]).to_string())
            .create_async()
            .await;

        let pr = client(&server).pull_request_detail(124).await.unwrap();

        assert_eq!(pr.number, 124);
        assert_eq!(pr.author_login(), "bob");
        assert_eq!(pr.labels, vec!["bug".to_string(), "backend".to_string()]);
        assert!(!pr.is_merged());
    }

    #[tokio::test]
    async fn lists_comments_with_bodies() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/acme/demo/issues/42/comments")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(json!([comment_json(1, "LGTM"), comment_json(2, "<!-- marker -->\nbody")]).to_string())
            .create_async()
            .await;

        let comments = client(&server).list_comments(42).await.unwrap();

        assert_eq!(
            comments,
            vec![
                Comment { id: 1, body: "LGTM".to_string() },
                Comment { id: 2, body: "<!-- marker -->\nbody".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn posts_and_patches_comments() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/repos/acme/demo/issues/42/comments")
            .match_body(Matcher::Json(json!({ "body": "hello" })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(comment_json(999, "hello").to_string())
            .create_async()
            .await;
        let update = server
            .mock("PATCH", "/repos/acme/demo/issues/comments/999")
            .match_body(Matcher::Json(json!({ "body": "again" })))
            .with_header("content-type", "application/json")
            .with_body(comment_json(999, "again").to_string())
            .create_async()
            .await;

        let client = client(&server);
        let created = client.create_comment(42, "hello").await.unwrap();
        client.update_comment(created.id, "again").await.unwrap();

        assert_eq!(created.id, 999);
        create.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn upstream_errors_propagate() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/acme/demo/pulls/7")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(json!({ "message": "Not Found", "documentation_url": "" }).to_string())
            .create_async()
            .await;

        let err = client(&server).pull_request_detail(7).await.unwrap_err();
        assert!(matches!(err, crate::error::ChangelogError::GitHub(_)));
    }
}
