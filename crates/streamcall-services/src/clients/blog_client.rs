use super::{ResponseStream, ServiceClient};
use crate::blog_service::{
    CREATE_RESOURCE, DELETE_RESOURCE, LIST_RESOURCES, READ_RESOURCE, UPDATE_RESOURCE,
};
use crate::model::*;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use streamcall::{Dispatcher, Status};

#[derive(Clone)]
pub struct BlogClient {
    dispatcher: Arc<Dispatcher<Message>>,
    timeout: Option<Duration>,
}

impl BlogClient {
    pub fn new(dispatcher: Arc<Dispatcher<Message>>) -> Self {
        Self {
            dispatcher,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Stores `resource` and returns it with its assigned id.
    pub async fn create_resource(&self, resource: Resource) -> Result<Resource, Status> {
        let response: CreateResourceResponse = self
            .unary(CREATE_RESOURCE, CreateResourceRequest { resource })
            .await?;
        Ok(response.resource)
    }

    pub async fn read_resource(&self, resource_id: impl Into<String>) -> Result<Resource, Status> {
        let request = ReadResourceRequest {
            resource_id: resource_id.into(),
        };
        let response: ReadResourceResponse = self.unary(READ_RESOURCE, request).await?;
        Ok(response.resource)
    }

    pub async fn update_resource(&self, resource: Resource) -> Result<Resource, Status> {
        let response: UpdateResourceResponse = self
            .unary(UPDATE_RESOURCE, UpdateResourceRequest { resource })
            .await?;
        Ok(response.resource)
    }

    /// Returns the id of the deleted resource.
    pub async fn delete_resource(&self, resource_id: impl Into<String>) -> Result<String, Status> {
        let request = DeleteResourceRequest {
            resource_id: resource_id.into(),
        };
        let response: DeleteResourceResponse = self.unary(DELETE_RESOURCE, request).await?;
        Ok(response.resource_id)
    }

    pub fn list_resources(&self) -> ResponseStream<Resource> {
        self.server_streaming(LIST_RESOURCES, ListResourcesRequest::default())
            .map(|item: Result<ListResourcesResponse, Status>| item.map(|r| r.resource))
            .boxed()
    }
}

impl ServiceClient for BlogClient {
    fn dispatcher(&self) -> &Dispatcher<Message> {
        &self.dispatcher
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
