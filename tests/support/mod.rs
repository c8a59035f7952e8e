use find_serverless_stacks::detection::ResourceRecord;
use find_serverless_stacks::progress::{ProgressEvent, ProgressHandler};
use std::sync::Mutex;

/// Resources of a stack deployed with the Serverless Framework
#[allow(dead_code)]
pub fn serverless_resources() -> Vec<ResourceRecord> {
    vec![
        ResourceRecord::new("ServerlessDeploymentBucket", "AWS::S3::Bucket"),
        ResourceRecord::new("MyFunction", "AWS::Lambda::Function"),
    ]
}

/// Resources of an ordinary stack
#[allow(dead_code)]
pub fn plain_resources() -> Vec<ResourceRecord> {
    vec![
        ResourceRecord::new("MyBucket", "AWS::S3::Bucket"),
        ResourceRecord::new("MyQueue", "AWS::SQS::Queue"),
    ]
}

/// Records every progress event for later inspection
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<ProgressEvent>>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressHandler for RecordingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
