use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::{NewUser, UserView};

pub struct UserService<R> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn register(&self, user: NewUser) -> Result<UserView, DomainError> {
        user.validate()?;
        let created = self.repo.create(user)?;
        log::info!("registered user {} as {}", created.id, created.role);
        Ok(created)
    }

    pub fn get_user(&self, id: Uuid) -> Result<UserView, DomainError> {
        self.repo.find_by_id(id)?.ok_or(DomainError::NotFound)
    }
}
