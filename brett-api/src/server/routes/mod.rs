mod posts;
mod tags;
mod users;

use crate::server::ServerRouter;

pub fn routes() -> ServerRouter {
    users::routes()
        .merge(posts::routes())
        .merge(tags::routes())
}
