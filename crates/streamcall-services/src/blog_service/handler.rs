use super::repository::ResourceRepository;
use super::BlogService;
use crate::model::*;
use async_trait::async_trait;
use futures::StreamExt;
use streamcall::{CallContext, Sender, Status};
use tracing::{debug, info};

/// The blog service over a [`ResourceRepository`].
#[derive(Clone)]
pub struct Blog {
    repository: ResourceRepository,
}

impl Blog {
    pub fn new(repository: ResourceRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl BlogService for Blog {
    async fn create_resource(
        &self,
        _ctx: &CallContext,
        request: CreateResourceRequest,
    ) -> Result<CreateResourceResponse, Status> {
        debug!(?request, "CreateResource");
        let resource = self.repository.create(request.resource).await?;
        Ok(CreateResourceResponse { resource })
    }

    async fn read_resource(
        &self,
        _ctx: &CallContext,
        request: ReadResourceRequest,
    ) -> Result<ReadResourceResponse, Status> {
        debug!(resource_id = %request.resource_id, "ReadResource");
        let resource = self.repository.read(&request.resource_id).await?;
        Ok(ReadResourceResponse { resource })
    }

    async fn update_resource(
        &self,
        _ctx: &CallContext,
        request: UpdateResourceRequest,
    ) -> Result<UpdateResourceResponse, Status> {
        debug!(?request, "UpdateResource");
        let resource = self.repository.update(request.resource).await?;
        Ok(UpdateResourceResponse { resource })
    }

    async fn delete_resource(
        &self,
        _ctx: &CallContext,
        request: DeleteResourceRequest,
    ) -> Result<DeleteResourceResponse, Status> {
        debug!(resource_id = %request.resource_id, "DeleteResource");
        let resource_id = self.repository.delete(&request.resource_id).await?;
        Ok(DeleteResourceResponse { resource_id })
    }

    async fn list_resources(
        &self,
        ctx: &CallContext,
        _request: ListResourcesRequest,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        let mut resources = self.repository.list();
        let mut sent = 0usize;
        while let Some(item) = resources.next().await {
            ctx.check()?;
            let resource = item?;
            responses.send(ListResourcesResponse { resource }).await?;
            sent += 1;
        }
        info!(sent, "Listed resources");
        Ok(())
    }
}
