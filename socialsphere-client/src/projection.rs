//! Last-known view of the feed. Mutated by full reloads or by point
//! mutations the adapter applies after a confirmed remote write; the last
//! write to local state wins. A point mutation whose target post is no
//! longer present is a no-op, so a mutation completing after the view
//! moved on cannot crash anything.

use socialsphere_common::model::{
    Id,
    post::{Comment, CommentMarker, Post, PostMarker, Reply},
    save::{SaveKey, SavedPost},
    user::UserMarker,
};

#[derive(Clone, Debug, Default)]
pub struct FeedProjection {
    posts: Vec<Post>,
    saved: Vec<SavedPost>,
}

impl FeedProjection {
    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    #[must_use]
    pub fn saved(&self) -> &[SavedPost] {
        &self.saved
    }

    #[must_use]
    pub fn post(&self, post_id: Id<PostMarker>) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == post_id)
    }

    pub fn replace_posts(&mut self, posts: Vec<Post>) {
        self.posts = posts;
    }

    pub fn replace_saved(&mut self, saved: Vec<SavedPost>) {
        self.saved = saved;
    }

    pub fn set_likes(&mut self, post_id: Id<PostMarker>, likes: Vec<Id<UserMarker>>) {
        if let Some(post) = self.post_mut(post_id) {
            post.likes = likes;
        }
    }

    pub fn push_comment(&mut self, post_id: Id<PostMarker>, comment: Comment) {
        if let Some(post) = self.post_mut(post_id) {
            post.comments.push(comment);
        }
    }

    pub fn push_reply(
        &mut self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
        reply: Reply,
    ) {
        let comment = self
            .post_mut(post_id)
            .and_then(|post| post.comments.iter_mut().find(|comment| comment.id == comment_id));
        if let Some(comment) = comment {
            comment.replies.push(reply);
        }
    }

    pub fn remove_post(&mut self, post_id: Id<PostMarker>) {
        self.posts.retain(|post| post.id != post_id);
    }

    pub fn remove_saved(&mut self, key: SaveKey) {
        self.saved.retain(|saved| saved.id != key);
    }

    fn post_mut(&mut self, post_id: Id<PostMarker>) -> Option<&mut Post> {
        self.posts.iter_mut().find(|post| post.id == post_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::projection::FeedProjection;
    use socialsphere_common::model::post::{Comment, Post, Reply};
    use time::macros::utc_datetime;

    fn post(id: u64) -> Post {
        Post {
            id: id.into(),
            image_url: format!("https://x/{id}.png"),
            username: "alice".to_owned(),
            user_id: 10_u64.into(),
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: utc_datetime!(2025-06-01 11:00),
        }
    }

    fn comment(id: u64) -> Comment {
        Comment {
            id: id.into(),
            text: "nice".to_owned(),
            username: "bob".to_owned(),
            created_at: utc_datetime!(2025-06-01 12:00),
            replies: Vec::new(),
        }
    }

    #[test]
    fn point_mutations_apply() {
        let mut projection = FeedProjection::default();
        projection.replace_posts(vec![post(1), post(2)]);

        projection.set_likes(1_u64.into(), vec![20_u64.into()]);
        projection.push_comment(2_u64.into(), comment(100));
        projection.push_reply(
            2_u64.into(),
            100_u64.into(),
            Reply {
                id: 101_u64.into(),
                text: "agreed".to_owned(),
                username: "alice".to_owned(),
                created_at: utc_datetime!(2025-06-01 12:01),
            },
        );

        assert_eq!(projection.post(1_u64.into()).unwrap().likes, vec![20_u64.into()]);
        let second = projection.post(2_u64.into()).unwrap();
        assert_eq!(second.comments.len(), 1);
        assert_eq!(second.comments[0].replies.len(), 1);
    }

    #[test]
    fn mutations_on_missing_posts_are_no_ops() {
        let mut projection = FeedProjection::default();
        projection.replace_posts(vec![post(1)]);

        projection.set_likes(9_u64.into(), vec![20_u64.into()]);
        projection.push_comment(9_u64.into(), comment(100));
        projection.push_reply(
            1_u64.into(),
            999_u64.into(),
            Reply {
                id: 101_u64.into(),
                text: "agreed".to_owned(),
                username: "alice".to_owned(),
                created_at: utc_datetime!(2025-06-01 12:01),
            },
        );
        projection.remove_post(9_u64.into());

        assert_eq!(projection.posts().len(), 1);
        let remaining = projection.post(1_u64.into()).unwrap();
        assert!(remaining.likes.is_empty());
        assert!(remaining.comments.is_empty());
    }

    #[test]
    fn last_replace_wins() {
        let mut projection = FeedProjection::default();
        projection.replace_posts(vec![post(1), post(2)]);
        projection.set_likes(1_u64.into(), vec![20_u64.into()]);

        projection.replace_posts(vec![post(1)]);
        assert!(projection.post(1_u64.into()).unwrap().likes.is_empty());
        assert!(projection.post(2_u64.into()).is_none());
    }

    #[test]
    fn remove_post() {
        let mut projection = FeedProjection::default();
        projection.replace_posts(vec![post(1), post(2)]);

        projection.remove_post(1_u64.into());
        assert!(projection.post(1_u64.into()).is_none());
        assert_eq!(projection.posts().len(), 1);
    }
}
