use vsteer_core::bucket::{Bucket, TimeMS};
use vsteer_testutils::bucket::MyBucket;

#[test]
fn test_bucket_update() {
    let mut bucket = MyBucket::default();
    let step0 = TimeMS::from(0);
    bucket.initialize(step0);
    assert!(bucket.initialized);
    assert_eq!(bucket.step, TimeMS::from(0));
    let step1 = TimeMS::from(1);
    bucket.before_agents(step1);
    assert_eq!(bucket.step, TimeMS::from(1));
    let step2 = TimeMS::from(2);
    bucket.before_agents(step2);
    assert_eq!(bucket.step, TimeMS::from(2));
}
