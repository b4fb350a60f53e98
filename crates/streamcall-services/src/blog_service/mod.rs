//! # Blog Service
//!
//! CRUD and listing over blog [`Resource`](crate::model::Resource)s, backed
//! by a [`ResourceRepository`].
//!
//! ## Structure
//!
//! - [`BlogService`] - the typed interface, one method per RPC
//! - [`UnimplementedBlogService`] - answers every method with `Unimplemented`
//! - [`BlogServer`] - adapts any `BlogService` to [`streamcall::Service`]
//! - [`Blog`] - the implementation over a repository
//! - [`repository`] - [`ResourceRepository`] and the persisted document shape
//! - [`error`] - [`RepositoryError`]
//!
//! | Method | Mode |
//! |--------|------|
//! | `CreateResource` | unary |
//! | `ReadResource` | unary |
//! | `UpdateResource` | unary |
//! | `DeleteResource` | unary |
//! | `ListResources` | server-stream |

pub mod error;
pub mod handler;
pub mod repository;
pub mod server;

pub use error::RepositoryError;
pub use handler::Blog;
pub use repository::{ResourceDocument, ResourceRepository, ResourceStream};
pub use server::BlogServer;

use crate::model::*;
use async_trait::async_trait;
use streamcall::{unimplemented_method, CallContext, Sender, Status};

pub const CREATE_RESOURCE: &str = "CreateResource";
pub const READ_RESOURCE: &str = "ReadResource";
pub const UPDATE_RESOURCE: &str = "UpdateResource";
pub const DELETE_RESOURCE: &str = "DeleteResource";
pub const LIST_RESOURCES: &str = "ListResources";

#[async_trait]
pub trait BlogService: Send + Sync + 'static {
    async fn create_resource(
        &self,
        ctx: &CallContext,
        request: CreateResourceRequest,
    ) -> Result<CreateResourceResponse, Status>;

    async fn read_resource(
        &self,
        ctx: &CallContext,
        request: ReadResourceRequest,
    ) -> Result<ReadResourceResponse, Status>;

    async fn update_resource(
        &self,
        ctx: &CallContext,
        request: UpdateResourceRequest,
    ) -> Result<UpdateResourceResponse, Status>;

    async fn delete_resource(
        &self,
        ctx: &CallContext,
        request: DeleteResourceRequest,
    ) -> Result<DeleteResourceResponse, Status>;

    /// Sends one [`ListResourcesResponse`] per stored resource.
    async fn list_resources(
        &self,
        ctx: &CallContext,
        request: ListResourcesRequest,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status>;
}

/// A `BlogService` that implements nothing. Partial implementations
/// delegate the methods they do not serve to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedBlogService;

#[async_trait]
impl BlogService for UnimplementedBlogService {
    async fn create_resource(
        &self,
        _ctx: &CallContext,
        _request: CreateResourceRequest,
    ) -> Result<CreateResourceResponse, Status> {
        Err(unimplemented_method(CREATE_RESOURCE))
    }

    async fn read_resource(
        &self,
        _ctx: &CallContext,
        _request: ReadResourceRequest,
    ) -> Result<ReadResourceResponse, Status> {
        Err(unimplemented_method(READ_RESOURCE))
    }

    async fn update_resource(
        &self,
        _ctx: &CallContext,
        _request: UpdateResourceRequest,
    ) -> Result<UpdateResourceResponse, Status> {
        Err(unimplemented_method(UPDATE_RESOURCE))
    }

    async fn delete_resource(
        &self,
        _ctx: &CallContext,
        _request: DeleteResourceRequest,
    ) -> Result<DeleteResourceResponse, Status> {
        Err(unimplemented_method(DELETE_RESOURCE))
    }

    async fn list_resources(
        &self,
        _ctx: &CallContext,
        _request: ListResourcesRequest,
        _responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        Err(unimplemented_method(LIST_RESOURCES))
    }
}
