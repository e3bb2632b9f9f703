use crate::coding::Location;
use crate::message::{FilterType, Subscribe};

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum FilterError {
    /// The requested range has already passed or ends before it starts.
    #[error("invalid range")]
    InvalidRange,

    /// The filter type requires bounds the message did not carry.
    #[error("missing bounds")]
    MissingBounds,
}

/// The delivery bounds of one subscription, resolved against the largest
/// location produced at evaluation time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SubscribeFilter {
    /// First admitted location.
    start: Location,

    /// Group-level admission only: any object of a group at or after
    /// `start.group_id` qualifies regardless of its object id.
    group_level: bool,

    /// Inclusive end bound, when the filter is a range.
    end_group_id: Option<u64>,
    end_object_id: Option<u64>,
}

impl SubscribeFilter {
    /// Resolve a filter from its wire fields.
    ///
    /// `largest` is the location of the largest object currently being
    /// produced, if any content exists yet.
    pub fn evaluate(
        filter_type: FilterType,
        start_location: Option<Location>,
        end_group_id: Option<u64>,
        end_object_id: Option<u64>,
        largest: Option<Location>,
    ) -> Result<Self, FilterError> {
        let largest = largest.unwrap_or_default();

        match filter_type {
            FilterType::LatestGroup => Ok(Self {
                start: Location::new(largest.group_id, 0),
                group_level: true,
                end_group_id: None,
                end_object_id: None,
            }),
            FilterType::LatestObject => Ok(Self {
                start: largest,
                group_level: false,
                end_group_id: None,
                end_object_id: None,
            }),
            FilterType::AbsoluteStart => {
                let start = start_location.ok_or(FilterError::MissingBounds)?;
                Ok(Self {
                    start,
                    group_level: false,
                    end_group_id: None,
                    end_object_id: None,
                })
            }
            FilterType::AbsoluteRange => {
                let start = start_location.ok_or(FilterError::MissingBounds)?;
                let end_group = end_group_id.ok_or(FilterError::MissingBounds)?;

                if end_group < start.group_id {
                    return Err(FilterError::InvalidRange);
                }
                if let Some(end_object) = end_object_id {
                    if end_group == start.group_id && end_object < start.object_id {
                        return Err(FilterError::InvalidRange);
                    }
                }

                // A range entirely behind current production has passed.
                let range_end = Location::new(end_group, end_object_id.unwrap_or(u64::MAX));
                if largest > range_end {
                    return Err(FilterError::InvalidRange);
                }

                Ok(Self {
                    start,
                    group_level: false,
                    end_group_id: Some(end_group),
                    end_object_id,
                })
            }
        }
    }

    /// Resolve the filter carried by a SUBSCRIBE.
    pub fn from_subscribe(msg: &Subscribe, largest: Option<Location>) -> Result<Self, FilterError> {
        Self::evaluate(
            msg.filter_type,
            msg.start_location,
            msg.end_group_id,
            msg.end_object_id,
            largest,
        )
    }

    /// Whether an object at `location` falls inside the filter.
    pub fn admits(&self, location: Location) -> bool {
        if self.group_level {
            if location.group_id < self.start.group_id {
                return false;
            }
        } else if location < self.start {
            return false;
        }

        if let Some(end_group) = self.end_group_id {
            match self.end_object_id {
                // With an end object the bound is object-exact.
                Some(end_object) => {
                    if location > Location::new(end_group, end_object) {
                        return false;
                    }
                }
                // Without one the entire end group is included.
                None => {
                    if location.group_id > end_group {
                        return false;
                    }
                }
            }
        }

        true
    }

    pub fn start(&self) -> Location {
        self.start
    }
}
