//! Typed wrappers for the coding-platform admin endpoints.
//!
//! Each wrapper is one `AdminClient::request` call and returns the response
//! body verbatim; unwrap it with `envelope::parse_list` / `parse_entity`.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::{json, Value};

use crate::client::{to_body, AdminClient, Query, RequestOptions};
use crate::error::ApiError;
use crate::http::{HttpMethod, Transport};
use crate::session::SessionStore;
use crate::types::{
    ContestProblemAssignment, ModuleOrder, ModuleUpdate, NewModule, NewTag, ProblemOrder,
};

const PLATFORM: &str = "/api/coding-platform";

fn path(rest: &str) -> String {
    format!("{PLATFORM}{rest}")
}

/// Ids are percent-encoded so a `/`, `?` or `#` stays inside its segment.
fn segment(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id)
}

impl<T: Transport, S: SessionStore> AdminClient<T, S> {
    // --- tags ---

    pub fn create_tag(&mut self, tag: &NewTag) -> Result<Value, ApiError> {
        self.request(&path("/tag/create"), RequestOptions::post(to_body(tag)?))
    }

    pub fn list_tags(&mut self, query: &Query) -> Result<Value, ApiError> {
        self.request(&path("/tag/getall"), RequestOptions::get().query(query))
    }

    pub fn get_tag(&mut self, id: &str) -> Result<Value, ApiError> {
        self.request(&path(&format!("/tag/get/{}", segment(id))), RequestOptions::get())
    }

    pub fn update_tag<B: Serialize>(&mut self, id: &str, update: &B) -> Result<Value, ApiError> {
        self.request(
            &path(&format!("/tag/update/{}", segment(id))),
            RequestOptions::put(to_body(update)?),
        )
    }

    pub fn delete_tag(&mut self, id: &str) -> Result<Value, ApiError> {
        self.request(&path(&format!("/tag/delete/{}", segment(id))), RequestOptions::delete())
    }

    // --- modules ---

    pub fn create_module(&mut self, module: &NewModule) -> Result<Value, ApiError> {
        self.request(&path("/module/create"), RequestOptions::post(to_body(module)?))
    }

    pub fn list_modules(&mut self, query: &Query) -> Result<Value, ApiError> {
        self.request(&path("/module/getall"), RequestOptions::get().query(query))
    }

    pub fn get_module(&mut self, id: &str) -> Result<Value, ApiError> {
        self.request(&path(&format!("/module/get/{}", segment(id))), RequestOptions::get())
    }

    pub fn update_module(&mut self, id: &str, update: &ModuleUpdate) -> Result<Value, ApiError> {
        self.request(
            &path(&format!("/module/update/{}", segment(id))),
            RequestOptions::put(to_body(update)?),
        )
    }

    pub fn delete_module(&mut self, id: &str) -> Result<Value, ApiError> {
        self.request(&path(&format!("/module/delete/{}", segment(id))), RequestOptions::delete())
    }

    pub fn reorder_modules(&mut self, orders: &[ModuleOrder]) -> Result<Value, ApiError> {
        self.request(
            &path("/module/reorder"),
            RequestOptions::put(json!({ "moduleOrders": to_body(orders)? })),
        )
    }

    // --- problems ---

    pub fn create_problem<B: Serialize>(&mut self, problem: &B) -> Result<Value, ApiError> {
        self.request(&path("/problem/create"), RequestOptions::post(to_body(problem)?))
    }

    pub fn list_problems(&mut self, query: &Query) -> Result<Value, ApiError> {
        self.request(&path("/problem/getall"), RequestOptions::get().query(query))
    }

    pub fn get_problem(&mut self, id: &str) -> Result<Value, ApiError> {
        self.request(&path(&format!("/problem/get/{}", segment(id))), RequestOptions::get())
    }

    pub fn update_problem<B: Serialize>(&mut self, id: &str, update: &B) -> Result<Value, ApiError> {
        self.request(
            &path(&format!("/problem/update/{}", segment(id))),
            RequestOptions::put(to_body(update)?),
        )
    }

    pub fn delete_problem(&mut self, id: &str) -> Result<Value, ApiError> {
        self.request(&path(&format!("/problem/delete/{}", segment(id))), RequestOptions::delete())
    }

    pub fn toggle_problem_active(&mut self, id: &str) -> Result<Value, ApiError> {
        self.request(
            &path(&format!("/problem/{}/toggle-active", segment(id))),
            RequestOptions::patch(),
        )
    }

    // --- test cases ---

    pub fn add_test_case<B: Serialize>(
        &mut self,
        problem_id: &str,
        test_case: &B,
    ) -> Result<Value, ApiError> {
        self.request(
            &path(&format!("/problem/{}/testcase", segment(problem_id))),
            RequestOptions::post(to_body(test_case)?),
        )
    }

    pub fn bulk_add_test_cases<B: Serialize>(
        &mut self,
        problem_id: &str,
        test_cases: &[B],
    ) -> Result<Value, ApiError> {
        self.request(
            &path(&format!("/problem/{}/testcases/bulk", segment(problem_id))),
            RequestOptions::post(json!({ "testCases": to_body(test_cases)? })),
        )
    }

    pub fn update_test_case<B: Serialize>(&mut self, id: &str, update: &B) -> Result<Value, ApiError> {
        self.request(
            &path(&format!("/problem/testcase/{}", segment(id))),
            RequestOptions::put(to_body(update)?),
        )
    }

    pub fn delete_test_case(&mut self, id: &str) -> Result<Value, ApiError> {
        self.request(&path(&format!("/problem/testcase/{}", segment(id))), RequestOptions::delete())
    }

    // --- contests ---

    pub fn create_contest<B: Serialize>(&mut self, contest: &B) -> Result<Value, ApiError> {
        self.request(&path("/contest/create"), RequestOptions::post(to_body(contest)?))
    }

    pub fn list_contests(&mut self, query: &Query) -> Result<Value, ApiError> {
        self.request(&path("/contest/getall"), RequestOptions::get().query(query))
    }

    pub fn get_contest(&mut self, id: &str) -> Result<Value, ApiError> {
        self.request(&path(&format!("/contest/get/{}", segment(id))), RequestOptions::get())
    }

    pub fn update_contest<B: Serialize>(&mut self, id: &str, update: &B) -> Result<Value, ApiError> {
        self.request(
            &path(&format!("/contest/update/{}", segment(id))),
            RequestOptions::put(to_body(update)?),
        )
    }

    pub fn delete_contest(&mut self, id: &str) -> Result<Value, ApiError> {
        self.request(&path(&format!("/contest/delete/{}", segment(id))), RequestOptions::delete())
    }

    pub fn add_problem_to_contest(
        &mut self,
        contest_id: &str,
        assignment: &ContestProblemAssignment,
    ) -> Result<Value, ApiError> {
        self.request(
            &path(&format!("/contest/{}/add-problem", segment(contest_id))),
            RequestOptions::post(to_body(assignment)?),
        )
    }

    pub fn remove_problem_from_contest(
        &mut self,
        contest_id: &str,
        problem_id: &str,
    ) -> Result<Value, ApiError> {
        self.request(
            &path(&format!(
                "/contest/{}/remove-problem/{}",
                segment(contest_id),
                segment(problem_id)
            )),
            RequestOptions::delete(),
        )
    }

    pub fn reorder_contest_problems(
        &mut self,
        contest_id: &str,
        orders: &[ProblemOrder],
    ) -> Result<Value, ApiError> {
        self.request(
            &path(&format!("/contest/{}/reorder-problems", segment(contest_id))),
            RequestOptions::put(json!({ "problemOrders": to_body(orders)? })),
        )
    }

    pub fn publish_contest(&mut self, id: &str) -> Result<Value, ApiError> {
        self.request(&path(&format!("/contest/{}/publish", segment(id))), RequestOptions::patch())
    }

    /// Ask the backend to recompute every contest's status from its schedule.
    pub fn update_contest_statuses(&mut self) -> Result<Value, ApiError> {
        self.request(
            &path("/contest/update-statuses"),
            RequestOptions::with_method(HttpMethod::Post),
        )
    }

    pub fn contest_leaderboard(&mut self, id: &str, query: &Query) -> Result<Value, ApiError> {
        self.request(
            &path(&format!("/contest/{}/leaderboard", segment(id))),
            RequestOptions::get().query(query),
        )
    }

    pub fn contest_submissions(&mut self, id: &str, query: &Query) -> Result<Value, ApiError> {
        self.request(
            &path(&format!("/contest/{}/submissions", segment(id))),
            RequestOptions::get().query(query),
        )
    }

    // --- submissions ---

    pub fn list_submissions(&mut self, query: &Query) -> Result<Value, ApiError> {
        self.request(&path("/submissions"), RequestOptions::get().query(query))
    }

    pub fn submission_stats(&mut self, query: &Query) -> Result<Value, ApiError> {
        self.request(&path("/submissions/stats"), RequestOptions::get().query(query))
    }

    pub fn get_submission(&mut self, id: &str) -> Result<Value, ApiError> {
        self.request(&path(&format!("/submissions/{}", segment(id))), RequestOptions::get())
    }

    pub fn delete_submission(&mut self, id: &str) -> Result<Value, ApiError> {
        self.request(&path(&format!("/submissions/{}", segment(id))), RequestOptions::delete())
    }
}
