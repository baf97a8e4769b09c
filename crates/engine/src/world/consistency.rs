use thiserror::Error;

use super::entity::EntityHandle;
use super::GameWorld;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("chunk {chunk} contains entity {entity:?} that doesn't think it's in that chunk")]
    MemberMissingChunk { chunk: usize, entity: EntityHandle },
    #[error("chunk {chunk} contains entity {entity:?} that is no longer alive")]
    DeadMember { chunk: usize, entity: EntityHandle },
    #[error("entity {entity:?} is in chunk {chunk} that doesn't think it contains that entity")]
    ChunkMissingMember { chunk: usize, entity: EntityHandle },
    #[error("entity {entity:?} refers to chunk {chunk} which does not exist")]
    UnknownChunk { chunk: usize, entity: EntityHandle },
    #[error("chunk {chunk} lists entity {entity:?} more than once")]
    DuplicateMember { chunk: usize, entity: EntityHandle },
    #[error("entity {entity:?} lists chunk {chunk} more than once")]
    DuplicateChunk { chunk: usize, entity: EntityHandle },
    #[error("live list holds {listed} handles but {alive} entities are alive")]
    LiveListMismatch { listed: usize, alive: usize },
}

impl GameWorld {
    /// Walks both directions of the chunk/entity membership relation. Only a
    /// bug in the maintenance code can make this fail.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        for (chunk_index, chunk) in self.chunks.iter().enumerate() {
            for (position, member) in chunk.members().iter().enumerate() {
                if chunk.members()[..position].contains(member) {
                    return Err(ConsistencyError::DuplicateMember {
                        chunk: chunk_index,
                        entity: *member,
                    });
                }
                let Some(entity) = self.entities.get(*member) else {
                    return Err(ConsistencyError::DeadMember {
                        chunk: chunk_index,
                        entity: *member,
                    });
                };
                if !entity.chunks().iter().any(|c| c.get() == chunk_index) {
                    return Err(ConsistencyError::MemberMissingChunk {
                        chunk: chunk_index,
                        entity: *member,
                    });
                }
            }
        }

        let alive = self.entities.len();
        if self.order.len() != alive {
            return Err(ConsistencyError::LiveListMismatch {
                listed: self.order.len(),
                alive,
            });
        }
        for handle in &self.order {
            let Some(entity) = self.entities.get(*handle) else {
                return Err(ConsistencyError::LiveListMismatch {
                    listed: self.order.len(),
                    alive,
                });
            };
            for (position, chunk) in entity.chunks().iter().enumerate() {
                if entity.chunks()[..position].contains(chunk) {
                    return Err(ConsistencyError::DuplicateChunk {
                        chunk: chunk.get(),
                        entity: *handle,
                    });
                }
                let Some(owner) = self.chunks.get(chunk.get()) else {
                    return Err(ConsistencyError::UnknownChunk {
                        chunk: chunk.get(),
                        entity: *handle,
                    });
                };
                if !owner.members().contains(handle) {
                    return Err(ConsistencyError::ChunkMissingMember {
                        chunk: chunk.get(),
                        entity: *handle,
                    });
                }
            }
        }
        Ok(())
    }
}
